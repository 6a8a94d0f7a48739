use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(
    thort_home: Option<PathBuf>,
    project_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    let base = thort_home.or(project_dir)?;
    Some(base.join(".env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("THORT_HOME").map(PathBuf::from),
        dirs::home_dir().map(|home| home.join("thortstream")),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_thort_home() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/archive")),
            Some(PathBuf::from("/home/alice/thortstream")),
        );
        assert_eq!(got, Some(PathBuf::from("/archive/.env")));
    }

    #[test]
    fn fallback_uses_home_project_dir_when_thort_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice/thortstream")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/thortstream/.env")));
    }
}
