//! Console rendering for the `cry` commands.

use crate::models::{slug, Credential, Team};
use crate::sync::{SyncAction, SyncReport};

/// One team with its folders and the `cry use` selector for each.
///
/// ```text
/// puzzle bbt => ruby lang (cry use puzzle-bbt/ruby-lang)
///               java (cry use puzzle-bbt/java)
/// ```
pub fn render_team(team: &Team) -> String {
    let team_name = team.name.to_lowercase();
    let head = format!("{team_name} => ");
    let indent = " ".repeat(head.chars().count());

    let rows: Vec<String> = team
        .folders
        .iter()
        .map(|folder| {
            format!(
                "{} (cry use {}/{})",
                folder.name.to_lowercase(),
                slug(&team.name),
                slug(&folder.name)
            )
        })
        .collect();

    format!("{head}{}", rows.join(&format!("\n{indent}")))
}

pub fn render_teams(teams: &[Team]) -> String {
    teams.iter().map(render_team).collect::<Vec<_>>().join("\n")
}

/// `key: value` lines for every field the record carries.
pub fn render_credential(credential: &Credential) -> String {
    let fields = [
        "id",
        "name",
        "type",
        "username",
        "password",
        "pin",
        "token",
        "email",
        "custom_attr",
    ];
    let mut lines: Vec<String> = fields
        .iter()
        .filter_map(|f| credential.field(f).map(|v| format!("{f}: {v}")))
        .collect();
    if credential.cluster_secret.is_some() {
        lines.push("ose_secret: (cluster secret payload, see --field ose_secret)".to_string());
    }
    lines.join("\n")
}

/// One line per item, e.g. `db: saved as 12` or `api: failed: ...`.
pub fn render_report(report: &SyncReport) -> String {
    report
        .items
        .iter()
        .map(|item| match &item.result {
            Ok(SyncAction::Saved { id }) => format!("{}: saved as {id}", item.name),
            Ok(SyncAction::Inserted) => format!("{}: pushed", item.name),
            Err(e) => format!("{}: failed: {e}", item.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Folder;

    #[test]
    fn test_render_team_aligns_folders() {
        let team = Team::new(
            1,
            "Puzzle BBT",
            vec![Folder::new(1, "Ruby Lang"), Folder::new(2, "java")],
        );

        let expected = format!(
            "puzzle bbt => ruby lang (cry use puzzle-bbt/ruby-lang)\n{}java (cry use puzzle-bbt/java)",
            " ".repeat("puzzle bbt => ".len())
        );
        assert_eq!(render_team(&team), expected);
    }

    #[test]
    fn test_render_team_without_folders() {
        let team = Team::new(1, "empty", Vec::new());
        assert_eq!(render_team(&team), "empty => ");
    }

    #[test]
    fn test_render_credential_skips_absent_fields() {
        let credential = Credential::new("db")
            .with_id(4)
            .with_username("admin")
            .with_password("hunter2");

        assert_eq!(
            render_credential(&credential),
            "id: 4\nname: db\ntype: credentials\nusername: admin\npassword: hunter2"
        );
    }
}
