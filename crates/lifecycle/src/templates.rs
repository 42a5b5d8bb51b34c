use acontext_domain::{Error, Result};

/// Embedded default skills seeded into every new Learning Space (§4.6).
/// `(slug, SKILL.md content)`.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("daily-logs", include_str!("templates/daily_logs.md")),
    ("user-general-facts", include_str!("templates/user_general_facts.md")),
];

/// Fail-fast check run at startup: every embedded template must parse as a
/// valid SKILL.md document (§4.6 step 4). A malformed template is a build
/// defect, not a runtime condition to tolerate.
pub fn validate_templates() -> Result<()> {
    for (slug, content) in TEMPLATES {
        let (name, _description) = acontext_skillagent::frontmatter::parse_front_matter(content)
            .map_err(|e| Error::FatalBug(format!("embedded template {slug} is malformed: {e}")))?;
        if name != *slug {
            return Err(Error::FatalBug(format!(
                "embedded template {slug} front-matter name {name} does not match its slug"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_are_valid() {
        validate_templates().unwrap();
    }

    #[test]
    fn there_are_at_least_two_default_templates() {
        assert!(TEMPLATES.len() >= 2);
    }
}
