use super::consts;
use super::normalize_id;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub prefix: String,
    pub bot_name: String,
    pub owner_id: Option<String>,
    pub sudo_users: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(consts::DEFAULT_DATA_DIR),
            prefix: consts::DEFAULT_PREFIX.to_owned(),
            bot_name: consts::BOT_NAME.to_owned(),
            owner_id: None,
            sudo_users: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let data_dir = dotenv::var("DATA_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let prefix = dotenv::var("BOT_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(defaults.prefix);
        let bot_name = dotenv::var("BOT_NAME").unwrap_or(defaults.bot_name);
        let owner_id = dotenv::var("OWNER_ID")
            .ok()
            .map(|o| normalize_id(&o))
            .filter(|o| !o.is_empty());
        let sudo_users = dotenv::var("SUDO_USERS")
            .map(|s| parse_id_list(&s))
            .unwrap_or_default();
        Config {
            data_dir,
            prefix,
            bot_name,
            owner_id,
            sudo_users,
        }
    }

    /// Owner and sudo users pass every admin check and can't be targeted.
    pub fn is_privileged(&self, user: &str) -> bool {
        let user = normalize_id(user);
        self.owner_id.as_deref() == Some(user.as_str()) || self.sudo_users.contains(&user)
    }
}

fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_id)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudo_list_is_normalized() {
        let ids = parse_id_list("39333@s.whatsapp.net, 42 ,,");
        assert_eq!(ids, vec!["39333".to_string(), "42".to_string()]);
    }

    #[test]
    fn privileged_matches_either_form() {
        let config = Config {
            owner_id: Some("100".into()),
            sudo_users: vec!["200".into()],
            ..Config::default()
        };
        assert!(config.is_privileged("100@c.us"));
        assert!(config.is_privileged("200"));
        assert!(!config.is_privileged("300"));
    }
}
