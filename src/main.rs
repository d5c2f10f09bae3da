use smallsh::flags::Flags;
use smallsh::logger;
use smallsh::shell::Shell;
use std::env;

fn main() -> Result<(), smallsh::error::ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("smallsh {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let log_env = env::var(logger::LOG_ENV).ok();
    logger::init(logger::level(flags.is_set("debug"), log_env.as_deref()));

    let mut shell = Shell::new(flags)?;
    shell.run()
}
