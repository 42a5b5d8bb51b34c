use serde::Deserialize;

use acontext_domain::Error;

#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    description: String,
}

/// Parses the `---\nname: ...\ndescription: ...\n---` header off a SKILL.md
/// document. Returns `(name, description)`; rejects invalid YAML or missing
/// fields (§4.5.3: "reject invalid YAML for SKILL.md").
pub fn parse_front_matter(content: &str) -> acontext_domain::Result<(String, String)> {
    let body = content.trim_start();
    let rest = body
        .strip_prefix("---")
        .ok_or_else(|| Error::Validation("SKILL.md must start with a --- front-matter block".to_string()))?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| Error::Validation("SKILL.md front-matter block is not closed".to_string()))?;
    let yaml = &rest[..end];
    let parsed: FrontMatter = serde_yaml::from_str(yaml)?;
    if parsed.name.trim().is_empty() || parsed.description.trim().is_empty() {
        return Err(Error::Validation("SKILL.md front-matter requires name and description".to_string()));
    }
    Ok((parsed.name, parsed.description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_front_matter() {
        let doc = "---\nname: Daily Logs\ndescription: Summarizes daily activity\n---\n\nBody text.";
        let (name, description) = parse_front_matter(doc).unwrap();
        assert_eq!(name, "Daily Logs");
        assert_eq!(description, "Summarizes daily activity");
    }

    #[test]
    fn rejects_missing_front_matter() {
        assert!(parse_front_matter("# Just a heading").is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        let doc = "---\nname: Daily Logs\n---\nBody";
        assert!(parse_front_matter(doc).is_err());
    }
}
