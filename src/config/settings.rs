use crate::config::schema::PinConfig;
use crate::pin::PinOptions;
use crate::rewrite::DEFAULT_IGNORE_DIRS;

/// Values given on the command line or through the environment.
///
/// `None` means "not given"; the config file or the default then applies.
/// Token fields already hold flag-or-environment values.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ignore_dirs: Option<Vec<String>>,
    pub ignore_owners: Option<Vec<String>>,
    pub ignore_repos: Option<Vec<String>>,
    pub strict_pinning_202508: bool,
    pub api_server: Option<String>,
    pub github_token: Option<String>,
    pub ghes_github_token: Option<String>,
    /// `GITHUB_API_URL`, consulted only when neither flag nor config names a server.
    pub env_api_url: Option<String>,
}

/// Effective settings after merging overrides, config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ignore_dirs: Vec<String>,
    pub pin: PinOptions,
    pub api_server: Option<String>,
    pub github_token: Option<String>,
    pub ghes_github_token: Option<String>,
}

impl Settings {
    pub fn merge(config: &PinConfig, overrides: Overrides) -> Self {
        let ignore_dirs = overrides
            .ignore_dirs
            .or_else(|| config.ignore_dirs.clone())
            .unwrap_or_else(|| DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect());

        let pin = PinOptions {
            ignore_owners: overrides
                .ignore_owners
                .unwrap_or_else(|| config.pin.ignore_owners.clone()),
            ignore_repos: overrides
                .ignore_repos
                .unwrap_or_else(|| config.pin.ignore_repos.clone()),
            strict_pinning: overrides.strict_pinning_202508 || config.pin.strict_pinning_202508,
        };

        let api_server = first_set([
            overrides.api_server,
            config.pin.api_server.clone(),
            overrides.env_api_url,
        ]);

        Self {
            ignore_dirs,
            pin,
            api_server,
            github_token: first_set([overrides.github_token, config.pin.github_token.clone()]),
            ghes_github_token: first_set([
                overrides.ghes_github_token,
                config.pin.ghes_github_token.clone(),
            ]),
        }
    }
}

fn first_set<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

/// Split comma-separated flag values, dropping blanks.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
