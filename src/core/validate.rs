use crate::core::{
    errors::{CofreError, CofreResult},
    models::{ProjectDraft, SecretDraft},
};

const MIN_MASTER_PASSWORD_LENGTH: usize = 6;

/// Validation runs before any remote call; a rejected draft never reaches
/// the gateway. Returns a normalized copy with trimmed fields.
pub fn secret_draft(draft: &SecretDraft) -> CofreResult<SecretDraft> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(CofreError::Validation("title is required".to_owned()));
    }
    if draft.password.is_empty() {
        return Err(CofreError::Validation("password is required".to_owned()));
    }

    let username = draft
        .username
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    Ok(SecretDraft {
        title: title.to_owned(),
        username,
        password: draft.password.clone(),
        project_id: draft.project_id,
    })
}

pub fn project_draft(draft: &ProjectDraft) -> CofreResult<ProjectDraft> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(CofreError::Validation("project name is required".to_owned()));
    }

    let description = draft
        .description
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    Ok(ProjectDraft {
        name: name.to_owned(),
        description,
    })
}

pub fn master_password(candidate: &str) -> CofreResult<()> {
    if candidate.chars().count() < MIN_MASTER_PASSWORD_LENGTH {
        return Err(CofreError::Validation(
            "master password must have at least 6 characters".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{master_password, project_draft, secret_draft};
    use crate::core::{
        errors::CofreError,
        models::{ProjectDraft, SecretDraft},
    };

    #[test]
    fn rejects_blank_title() {
        let result = secret_draft(&SecretDraft {
            title: "   ".to_owned(),
            username: None,
            password: "x".to_owned(),
            project_id: None,
        });
        assert!(matches!(result, Err(CofreError::Validation(_))));
    }

    #[test]
    fn rejects_empty_password() {
        let result = secret_draft(&SecretDraft {
            title: "GitHub".to_owned(),
            username: None,
            password: String::new(),
            project_id: None,
        });
        assert!(matches!(result, Err(CofreError::Validation(_))));
    }

    #[test]
    fn normalizes_blank_username_to_none() {
        let draft = secret_draft(&SecretDraft {
            title: " GitHub ".to_owned(),
            username: Some("  ".to_owned()),
            password: "x".to_owned(),
            project_id: Some(3),
        })
        .expect("draft should validate");

        assert_eq!(draft.title, "GitHub");
        assert!(draft.username.is_none());
        assert_eq!(draft.project_id, Some(3));
    }

    #[test]
    fn rejects_blank_project_name() {
        let result = project_draft(&ProjectDraft {
            name: String::new(),
            description: None,
        });
        assert!(matches!(result, Err(CofreError::Validation(_))));
    }

    #[test]
    fn master_password_minimum_length() {
        assert!(master_password("short").is_err());
        assert!(master_password("longer").is_ok());
    }
}
