//! Path layout for the Task Store's on-disk artifacts. The `.taskmaster`
//! directory tree is the one concrete detail of the file format this crate
//! commits to; everything else about the format is the Task Store's own
//! concern.

use std::path::{Path, PathBuf};

const TASKMASTER_DIR: &str = ".taskmaster";

pub fn taskmaster_root(project_root: &Path) -> PathBuf {
    project_root.join(TASKMASTER_DIR)
}

pub fn tasks_file(project_root: &Path) -> PathBuf {
    taskmaster_root(project_root).join("tasks").join("tasks.json")
}

/// `task_<id>.txt` for the default tag, `task_<id>_<tag>.txt` otherwise.
pub fn derived_task_file(project_root: &Path, task_id: u32, tag: &str, default_tag: &str) -> PathBuf {
    let file_name = if tag == default_tag {
        format!("task_{task_id:03}.txt")
    } else {
        format!("task_{task_id:03}_{tag}.txt")
    };
    taskmaster_root(project_root).join("tasks").join(file_name)
}

pub fn complexity_report_file(project_root: &Path) -> PathBuf {
    taskmaster_root(project_root)
        .join("reports")
        .join("task-complexity-report.json")
}

pub fn research_doc_file(project_root: &Path, date: &str, slug: &str) -> PathBuf {
    taskmaster_root(project_root)
        .join("docs")
        .join("research")
        .join(format!("{date}_{slug}.md"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_file_has_no_suffix() {
        let path = derived_task_file(Path::new("/p"), 3, "master", "master");
        assert_eq!(path, Path::new("/p/.taskmaster/tasks/task_003.txt"));
    }

    #[test]
    fn non_default_tag_gets_a_suffix() {
        let path = derived_task_file(Path::new("/p"), 3, "feature-x", "master");
        assert_eq!(
            path,
            Path::new("/p/.taskmaster/tasks/task_003_feature-x.txt")
        );
    }
}
