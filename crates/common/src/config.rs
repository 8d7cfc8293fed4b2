use std::{path::PathBuf, time::Duration};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
///
/// [`FromStr`]: std::str::FromStr
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// Local project configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct Project {
    /// Credentials file path, relative to the project root.
    pub credentials_file: PathBuf,

    /// Gitignore-style patterns of paths left out of the source bundle and the content hash.
    pub exclude: Vec<String>,

    /// Regions that support Elastic Beanstalk deployments.
    pub allowed_regions: Vec<String>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.json"),
            exclude: [
                ".git",
                ".gitignore",
                ".idea",
                "docker-compose.yml",
                "Deploy.toml",
                ".DS_Store",
                "*.zip",
                "credentials.json",
                "credentials.json.template",
            ]
            .map(String::from)
            .to_vec(),
            allowed_regions: [
                "us-east-1",
                "us-west-1",
                "us-west-2",
                "ap-south-1",
                "ap-northeast-2",
                "ap-southeast-1",
                "ap-southeast-2",
                "ap-northeast-1",
                "eu-central-1",
                "eu-west-1",
                "sa-east-1",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Elastic Beanstalk environment template.
///
/// Optional values are left out of the environment option settings
/// when not configured, in which case the provider defaults apply.
#[derive(Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Solution stack the environment runs on.
    pub solution_stack_name: String,

    /// EC2 instance type.
    pub instance_type: String,

    /// Either `SingleInstance` or `LoadBalanced`.
    pub environment_type: String,

    /// Elastic Beanstalk service role.
    pub service_role: String,

    /// IAM instance profile attached to the EC2 instances.
    pub iam_instance_profile: String,

    /// Associate public IP addresses with the instances.
    pub associate_public_ip_address: bool,

    /// VPC subnet identifiers.
    pub subnets: Vec<String>,

    /// VPC identifier.
    pub vpc_id: Option<String>,

    /// Security group identifiers.
    pub security_groups: Vec<String>,

    /// EC2 key pair name.
    pub key_name: Option<String>,

    /// SNS notification endpoint (usually an email address).
    pub notification_endpoint: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            solution_stack_name: String::from(
                "64bit Amazon Linux 2016.03 v2.1.7 running Multi-container Docker 1.11.2 (Generic)",
            ),
            instance_type: String::from("t2.nano"),
            environment_type: String::from("SingleInstance"),
            service_role: String::from("aws-elasticbeanstalk-service-role"),
            iam_instance_profile: String::from("aws-elasticbeanstalk-ec2-role"),
            associate_public_ip_address: true,
            subnets: Vec::new(),
            vpc_id: None,
            security_groups: Vec::new(),
            key_name: None,
            notification_endpoint: None,
        }
    }
}

/// Environment health polling configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct Health {
    /// Delay between two status requests, in seconds.
    pub poll_interval: u64,

    /// Max time to wait for the environment to become healthy, in seconds.
    pub timeout: u64,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            poll_interval: 5,
            timeout: 3600,
        }
    }
}

impl Health {
    /// Delay between two status requests.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Upper bound of the whole polling process.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Deployed page verification.
#[derive(Deserialize)]
#[serde(default)]
pub struct Page {
    /// CSS selector of the checked element.
    pub selector: String,

    /// Text the first matching element must contain, exactly.
    pub expected_text: String,

    /// Page request timeout, in seconds.
    pub timeout: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            selector: String::from("body h1"),
            expected_text: String::from("Automation for the People"),
            timeout: 30,
        }
    }
}

impl Page {
    /// Page request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// General configuration.
#[derive(Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,

    /// Local project configuration.
    #[serde(default)]
    pub project: Project,

    /// Environment template.
    #[serde(default)]
    pub environment: Environment,

    /// Health polling configuration.
    #[serde(default)]
    pub health: Health,

    /// Deployed page verification.
    #[serde(default)]
    pub page: Page,
}

impl Config {
    /// Create new config using default configuration file or environment variables.
    ///
    /// See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.unwrap_or(PathBuf::from("Deploy.toml"))))
            .merge(Env::prefixed("DEPLOY_").split("__"))
            .extract()
    }

    /// Create new config suitable for running unit tests.
    ///
    /// Health polling does not wait between requests.
    #[cfg(feature = "test-utils")]
    pub fn for_tests() -> Self {
        Self {
            health: Health {
                poll_interval: 0,
                timeout: 5,
            },
            page: Page {
                timeout: 5,
                ..Page::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::Config;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_| {
            let config = Config::new(None)?;

            assert_eq!(config.health.poll_interval, 5);
            assert_eq!(config.page.selector, "body h1");
            assert_eq!(config.environment.instance_type, "t2.nano");
            assert!(config.environment.subnets.is_empty());
            assert!(config
                .project
                .allowed_regions
                .iter()
                .any(|region| region == "eu-west-1"));

            Ok(())
        });
    }

    #[test]
    fn file_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Deploy.toml",
                r#"
                [environment]
                instance_type = "t3.micro"
                subnets = ["subnet-1", "subnet-2"]
                vpc_id = "vpc-1"

                [health]
                timeout = 60
                "#,
            )?;
            jail.set_env("DEPLOY_PAGE__EXPECTED_TEXT", "Hello");

            let config = Config::new(None)?;

            assert_eq!(config.environment.instance_type, "t3.micro");
            assert_eq!(config.environment.subnets, ["subnet-1", "subnet-2"]);
            assert_eq!(config.environment.vpc_id.as_deref(), Some("vpc-1"));
            assert_eq!(config.health.timeout, 60);
            assert_eq!(config.health.poll_interval, 5);
            assert_eq!(config.page.expected_text, "Hello");

            Ok(())
        });
    }
}
