// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates capstan.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::AppName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    app: Option<&str>,
    deploy_dir: Option<&Path>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(a) = app {
        config.app = AppName::new(a).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    if let Some(d) = deploy_dir {
        if !d.is_absolute() {
            return Err(Error::InvalidConfig(format!(
                "deploy_dir is not absolute path: {}",
                d.display()
            )));
        }
        config.deploy_dir = PathBuf::from(d);
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"app: {}
deploy_dir: {}
# Ownership applied to every extracted release (chown -R owner[:group])
# owner: deploy
# group: www-data
# Upper bound for one deploy run
timeout: {}s
# destinations:
#   staging:
#     deploy_dir: /srv/staging
"#,
        config.app,
        config.deploy_dir.display(),
        config.timeout.as_secs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips() {
        let yaml = generate_template_yaml(&Config::template());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.app.as_str(), "my-app");
        assert_eq!(config.timeout, Config::template().timeout);
    }
}
