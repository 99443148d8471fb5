//! Secret resolution for deploys.
//!
//! Handlers declare which secrets they need; values come from repeated
//! `--secret phase:key=value` flags, falling back to
//! `PIPEWRIGHT_SECRET_<PHASE>_<KEY>` environment variables. Values are never
//! echoed back or logged.

use anyhow::{bail, Result};
use pipewright_engine::lifecycle::PipelineSecrets;
use pipewright_types::SecretQuestion;

/// Parse one `phase:key=value` flag.
pub fn parse_flag(flag: &str) -> Result<(String, String, String)> {
    let Some((target, value)) = flag.split_once('=') else {
        bail!("invalid --secret '{flag}': expected phase:key=value");
    };
    let Some((phase, key)) = target.split_once(':') else {
        bail!("invalid --secret '{flag}': expected phase:key=value");
    };
    if phase.is_empty() || key.is_empty() {
        bail!("invalid --secret '{flag}': expected phase:key=value");
    }
    Ok((phase.to_string(), key.to_string(), value.to_string()))
}

/// Environment variable consulted when no flag supplies the secret.
pub fn env_var_name(phase_name: &str, key: &str) -> String {
    let sanitize = |s: &str| {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect::<String>()
    };
    format!("PIPEWRIGHT_SECRET_{}_{}", sanitize(phase_name), sanitize(key))
}

/// Resolve every question for one pipeline from flags and the environment.
///
/// # Errors
///
/// Lists every unresolved secret in one error so the caller can fix them all
/// at once.
pub fn resolve(
    questions: &[SecretQuestion],
    flags: &[(String, String, String)],
) -> Result<PipelineSecrets> {
    let mut secrets = PipelineSecrets::new();
    let mut missing = Vec::new();

    for q in questions {
        let from_flag = flags
            .iter()
            .find(|(phase, key, _)| *phase == q.phase_name && *key == q.key)
            .map(|(_, _, value)| value.clone());
        let value = from_flag.or_else(|| std::env::var(env_var_name(&q.phase_name, &q.key)).ok());

        match value {
            Some(value) => {
                secrets
                    .entry(q.phase_name.clone())
                    .or_default()
                    .insert(q.key.clone(), value);
            }
            None => missing.push(format!(
                "{} (--secret {}:{}=... or ${})",
                q.prompt,
                q.phase_name,
                q.key,
                env_var_name(&q.phase_name, &q.key)
            )),
        }
    }

    if !missing.is_empty() {
        bail!("Missing secret(s):\n  - {}", missing.join("\n  - "));
    }
    Ok(secrets)
}
