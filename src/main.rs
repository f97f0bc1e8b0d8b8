use clap::Parser;
use miette::Result;
use ims::cli::helpers::discover_project;
use ims::cli::{Cli, Commands};
use ims::core::Config;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let config = Config::load_for(discover_project(&global).as_ref());
    ims::core::logging::init(&config, global.verbose, global.quiet);

    match cli.command {
        Commands::Init(args) => ims::cli::commands::init::run(args),
        Commands::Import(args) => ims::cli::commands::import::run(args, &global),
        Commands::Data(cmd) => ims::cli::commands::data::run(cmd, &global),
        Commands::Sup(cmd) => ims::cli::commands::sup::run(cmd, &global),
        Commands::Mat(cmd) => ims::cli::commands::mat::run(cmd, &global),
        Commands::Report(cmd) => ims::cli::commands::report::run(cmd, &global),
        Commands::Call(args) => ims::cli::commands::call::run(args, &global),
        Commands::Params(args) => ims::cli::commands::params::run(args, &global),
        Commands::Normalize(args) => ims::cli::commands::normalize::run(args),
        Commands::Status(args) => ims::cli::commands::status::run(args, &global),
        Commands::Config(cmd) => ims::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => ims::cli::commands::completions::run(args),
    }
}
