use uuid::Uuid;

/// Per-run state threaded through one skill-agent loop (§4.5.2-3).
pub struct SkillAgentCtx {
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub learning_space_id: Uuid,
    /// `(id, name, description)` triples, refreshed whenever `create_skill`
    /// registers a new one so later iterations see it without a re-query.
    pub skills: Vec<(Uuid, String, String)>,
    pub has_reported_thinking: bool,
}

impl SkillAgentCtx {
    pub fn new(project_id: Uuid, user_id: Option<Uuid>, learning_space_id: Uuid, skills: Vec<(Uuid, String, String)>) -> Self {
        Self {
            project_id,
            user_id,
            learning_space_id,
            skills,
            has_reported_thinking: false,
        }
    }

    pub fn skills_view(&self) -> String {
        self.skills
            .iter()
            .map(|(_, name, description)| format!("- {name}: {description}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
