use std::path::PathBuf;

use clap::Parser;

/// CLI configuration.
#[derive(Parser)]
#[command(about)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(short, long, default_value = "Deploy.toml")]
    pub config_file: PathBuf,

    /// Directory to deploy, defaults to the current directory.
    #[arg(short, long)]
    pub project_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::Cli;

    #[test]
    fn runs_without_arguments() {
        let cli = Cli::try_parse_from(["deployer"]).expect("arguments must be optional");

        assert_eq!(cli.config_file, Path::new("Deploy.toml"));
        assert_eq!(cli.project_dir, None);
    }

    #[test]
    fn explicit_paths() {
        let cli = Cli::try_parse_from([
            "deployer",
            "--config-file",
            "deploy/prod.toml",
            "--project-dir",
            "site",
        ])
        .expect("arguments must be valid");

        assert_eq!(cli.config_file, Path::new("deploy/prod.toml"));
        assert_eq!(cli.project_dir.as_deref(), Some(Path::new("site")));
    }
}
