use std::process::ExitCode;

fn main() -> ExitCode {
    sitecfg_cli::run()
}
