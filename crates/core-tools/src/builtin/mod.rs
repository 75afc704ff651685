// SPDX-License-Identifier: Apache-2.0
mod grep;
mod list_directory;
mod read_file;
mod run_terminal_command;
mod write_file;

pub use grep::GrepTool;
pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use run_terminal_command::RunTerminalCommandTool;
pub use write_file::WriteFileTool;
