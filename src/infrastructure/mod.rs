pub mod docker;
pub mod process;

pub use docker::DockerCli;
pub use process::{run_command, CommandOutput, ProcessError};
