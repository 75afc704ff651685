// SPDX-License-Identifier: Apache-2.0

/// §6.3 exit codes, mapped to `std::process::exit` in `main()` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Normal,
    Interrupt,
    StartupFailure,
    BadConfig,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Normal => 0,
            ExitCode::Interrupt => 130,
            ExitCode::StartupFailure => 1,
            ExitCode::BadConfig => 2,
        }
    }
}

impl From<&crate::error::StartupError> for ExitCode {
    fn from(error: &crate::error::StartupError) -> Self {
        if error.is_bad_config() {
            ExitCode::BadConfig
        } else {
            ExitCode::StartupFailure
        }
    }
}
