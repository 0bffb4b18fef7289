//! CSV export of known users.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{model::UserProfile, Result};

const HEADER: [&str; 6] = [
    "user_id",
    "username",
    "first_name",
    "last_name",
    "lang_code",
    "last_seen",
];

/// Quote a field when it holds a separator, quote or line break (RFC 4180).
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_row(user: &UserProfile) -> String {
    [
        user.id.to_string(),
        csv_field(user.username.as_deref().unwrap_or("")),
        csv_field(&user.first_name),
        csv_field(user.last_name.as_deref().unwrap_or("")),
        csv_field(user.language_code.as_deref().unwrap_or("")),
        user.last_seen.to_string(),
    ]
    .join(",")
}

pub fn write_users_csv(out: &mut impl Write, users: &[UserProfile]) -> Result<()> {
    write!(out, "{}\r\n", HEADER.join(","))?;
    for u in users {
        write!(out, "{}\r\n", csv_row(u))?;
    }
    out.flush()?;
    Ok(())
}

/// Overwrite `path` with all users; returns the number of rows written.
pub fn export_users(path: &Path, users: &[UserProfile]) -> Result<usize> {
    let mut file = BufWriter::new(File::create(path)?);
    write_users_csv(&mut file, users)?;
    Ok(users.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::UserId;

    fn user(id: i64, first: &str, username: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId(id),
            username: username.map(str::to_string),
            first_name: first.to_string(),
            last_name: None,
            language_code: Some("en".to_string()),
            last_seen: 1_700_000_000,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let mut buf = Vec::new();
        write_users_csv(&mut buf, &[user(1, "Ada", Some("ada")), user(2, "Bob", None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "user_id,username,first_name,last_name,lang_code,last_seen\r\n\
1,ada,Ada,,en,1700000000\r\n\
2,,Bob,,en,1700000000\r\n"
        );
    }

    #[test]
    fn quotes_fields_with_separators() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn export_overwrites_file() {
        let path = std::env::temp_dir().join(format!("idf-export-{}.csv", std::process::id()));
        std::fs::write(&path, "stale").unwrap();

        let n = export_users(&path, &[user(7, "Eve", None)]).unwrap();
        assert_eq!(n, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("user_id,"));
        assert!(!text.contains("stale"));

        let _ = std::fs::remove_file(&path);
    }
}
