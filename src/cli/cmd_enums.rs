use clap::{Args, Parser, Subcommand};

/// Defines the command-line interface (CLI) for 'pkm-bootstrap'.
#[derive(Parser, Debug)]
#[command(name = "pkm-bootstrap", version)]
#[command(about = "Installs pkm into an isolated container that never touches other package managers")]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to the bootstrap configuration file (defaults to ~/.pkm-bootstrap/config.yaml).
    #[arg(long, global = true, env = "PKM_BOOTSTRAP_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Installs or upgrades pkm.
    /// Without --from-archive/--from-dir the payload is fetched from the release index.
    Install(InstallArgs),
    /// Removes the installed pkm container.
    Uninstall {
        /// Only look for the container under this directory.
        #[arg(long, env = "PKM_BOOTSTRAP_ROOT")]
        root: Option<String>,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Shows the detected environment and the installed container.
    Status {
        /// Print the installed container's marker as JSON.
        #[arg(long)]
        json: bool,
        #[arg(long, env = "PKM_BOOTSTRAP_ROOT")]
        root: Option<String>,
    },
    /// Lists the versions available in the release index.
    List {
        /// Release index URL, overriding the configured one.
        #[arg(long, env = "PKM_BOOTSTRAP_INDEX_URL")]
        index_url: Option<String>,
    },
    /// Shows the version of pkm-bootstrap.
    Version,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Version to install from the release index ("latest" or e.g. "0.4.0").
    #[arg(default_value = "latest", conflicts_with_all = ["from_archive", "from_dir"])]
    pub version: String,

    /// Install a payload archive another package manager placed on disk.
    #[arg(long, value_name = "PATH", conflicts_with = "from_dir")]
    pub from_archive: Option<String>,

    /// Install an unpacked payload directory another package manager placed on disk.
    #[arg(long, value_name = "PATH")]
    pub from_dir: Option<String>,

    /// Name of the package manager delegating the install (recorded in the marker).
    #[arg(long, value_name = "NAME", default_value = "external")]
    pub manager: String,

    /// Install under this directory instead of the configured candidate roots.
    #[arg(long, env = "PKM_BOOTSTRAP_ROOT")]
    pub root: Option<String>,

    /// Release index URL, overriding the configured one.
    #[arg(long, env = "PKM_BOOTSTRAP_INDEX_URL")]
    pub index_url: Option<String>,

    /// Reinstall the same version, or allow a downgrade.
    #[arg(short, long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delegated_install_parses() {
        let cli = Cli::try_parse_from([
            "pkm-bootstrap",
            "install",
            "--from-archive",
            "/tmp/pkm.tar.gz",
            "--manager",
            "pip",
        ])
        .unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.from_archive.as_deref(), Some("/tmp/pkm.tar.gz"));
                assert_eq!(args.manager, "pip");
                assert_eq!(args.version, "latest");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn archive_and_directory_are_exclusive() {
        assert!(Cli::try_parse_from([
            "pkm-bootstrap",
            "install",
            "--from-archive",
            "a.tar.gz",
            "--from-dir",
            "b"
        ])
        .is_err());
    }
}
