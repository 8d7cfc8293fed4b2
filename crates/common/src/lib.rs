pub mod config;
pub mod credentials;
pub mod hash;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "aws")]
pub mod beanstalk;

#[cfg(feature = "aws")]
pub mod s3;
