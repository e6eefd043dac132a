use std::collections::HashMap;

use anyhow::Result;
use indexmap::IndexMap;
use tokio::process::Command;

use crate::{
    config::{expand_home, Config},
    error::Error,
    fs::{cmd::CheckCommandOutput as _, mount_table::mount_target},
};

/// Placeholders available to the command templates of device `name`.
///
/// Every labelled device is bound to its mount point, so a hook can refer to
/// the path of another device as `{other_name}`.
pub fn template_vars(config: &Config, name: &str) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = config
        .devices()
        .filter_map(|(device_name, device)| {
            let label = device.label.as_deref()?;
            let target = mount_target(&config.defaults.media_dir, device_name, Some(label));
            Some((device_name.to_owned(), target.display().to_string()))
        })
        .collect();
    vars.insert("name".to_owned(), name.to_owned());
    vars
}

/// Substitute `{var}` placeholders. `{{` and `}}` produce literal braces.
pub fn render(template: &str, vars: &HashMap<String, String>) -> Result<String, Error> {
    let bad = |reason: String| Error::Template {
        template: template.to_owned(),
        reason,
    };

    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut var = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(bad("unclosed placeholder".to_owned())),
                        Some(ch) => var.push(ch),
                    }
                }
                let value = vars
                    .get(&var)
                    .ok_or_else(|| bad(format!("unknown placeholder `{{{var}}}`")))?;
                output.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(bad("single `}` in template".to_owned())),
            ch => output.push(ch),
        }
    }
    Ok(output)
}

/// Render a command template for device `name` and run it through the shell.
///
/// `env` entries are added on top of the inherited environment, with a
/// leading `~` expanded. Returns the exit code of the command.
pub async fn run(
    config: &Config,
    name: &str,
    template: &str,
    env: Option<&IndexMap<String, String>>,
) -> Result<i32> {
    let command = render(template, &template_vars(config, name))?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&command);
    if let Some(env) = env {
        for (key, value) in env {
            cmd.env(key, expand_home(value));
        }
    }

    tracing::debug!("Running `{command}` for device {name}");
    cmd.run_inherited().await
}
