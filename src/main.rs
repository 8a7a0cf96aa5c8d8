use std::process::ExitCode;

fn main() -> ExitCode {
    rigcorder_lib::run()
}
