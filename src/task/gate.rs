//! Dependency gate: may a task be started or progressed right now?
//!
//! A dependency title resolves the way the scheduler resolves it: to the
//! last task carrying that title (highest id, since tasks are stored in draft
//! order). A title that matches no task never blocks, and a reference that
//! resolves to the task itself is ignored.

use super::task::{TaskRecord, TaskStatus};

/// The parts of a task the gate looks at.
pub trait DependencyView {
    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn status(&self) -> TaskStatus;
    fn dependencies(&self) -> &[String];
}

impl DependencyView for TaskRecord {
    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Dependency titles of `task` that resolve to an unfinished task in `all`,
/// in the order `task` lists them.
pub fn blocking_dependencies<'t, T: DependencyView>(task: &'t T, all: &[T]) -> Vec<&'t str> {
    task.dependencies()
        .iter()
        .map(String::as_str)
        .filter(|dep| {
            resolve(dep, all).is_some_and(|other| {
                other.id() != task.id() && other.status() != TaskStatus::Completed
            })
        })
        .collect()
}

fn resolve<'a, T: DependencyView>(title: &str, all: &'a [T]) -> Option<&'a T> {
    all.iter()
        .filter(|other| other.title() == title)
        .max_by_key(|other| other.id())
}

/// Whether `task` is eligible to start or progress given the rest of its goal.
pub fn is_eligible<T: DependencyView>(task: &T, all: &[T]) -> bool {
    blocking_dependencies(task, all).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        id: i64,
        title: String,
        status: TaskStatus,
        deps: Vec<String>,
    }

    impl DependencyView for Stub {
        fn id(&self) -> i64 {
            self.id
        }
        fn title(&self) -> &str {
            &self.title
        }
        fn status(&self) -> TaskStatus {
            self.status
        }
        fn dependencies(&self) -> &[String] {
            &self.deps
        }
    }

    fn stub(id: i64, title: &str, status: TaskStatus, deps: &[&str]) -> Stub {
        Stub {
            id,
            title: title.to_string(),
            status,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn no_dependencies_is_always_eligible() {
        let tasks = vec![stub(1, "solo", TaskStatus::Pending, &[])];
        assert!(is_eligible(&tasks[0], &tasks));
    }

    #[test]
    fn blocked_until_every_dependency_completes() {
        let mut tasks = vec![
            stub(1, "a", TaskStatus::Completed, &[]),
            stub(2, "b", TaskStatus::Pending, &[]),
            stub(3, "c", TaskStatus::Pending, &["a", "b"]),
        ];
        assert!(!is_eligible(&tasks[2], &tasks));
        assert_eq!(blocking_dependencies(&tasks[2], &tasks), vec!["b"]);

        tasks[1].status = TaskStatus::InProgress;
        assert!(!is_eligible(&tasks[2], &tasks));

        tasks[1].status = TaskStatus::Completed;
        assert!(is_eligible(&tasks[2], &tasks));
    }

    #[test]
    fn unknown_dependency_never_blocks() {
        let tasks = vec![
            stub(1, "a", TaskStatus::Completed, &[]),
            stub(2, "b", TaskStatus::Pending, &["a", "ghost"]),
        ];
        assert!(is_eligible(&tasks[1], &tasks));
    }

    #[test]
    fn self_reference_does_not_block() {
        let tasks = vec![stub(1, "me", TaskStatus::Pending, &["me"])];
        assert!(is_eligible(&tasks[0], &tasks));
    }

    #[test]
    fn duplicate_titles_resolve_to_last() {
        let mut tasks = vec![
            stub(1, "prep", TaskStatus::Pending, &[]),
            stub(2, "prep", TaskStatus::Completed, &[]),
            stub(3, "go", TaskStatus::Pending, &["prep"]),
        ];
        assert!(is_eligible(&tasks[2], &tasks));

        tasks[0].status = TaskStatus::Completed;
        tasks[1].status = TaskStatus::InProgress;
        assert_eq!(blocking_dependencies(&tasks[2], &tasks), vec!["prep"]);

        // Listing order does not matter, only which task came last.
        tasks.swap(0, 1);
        assert_eq!(blocking_dependencies(&tasks[2], &tasks), vec!["prep"]);
    }

    #[test]
    fn shadowed_duplicate_waits_on_the_last_one() {
        let tasks = vec![
            stub(1, "draft", TaskStatus::Pending, &["draft"]),
            stub(2, "draft", TaskStatus::Pending, &[]),
        ];
        assert_eq!(blocking_dependencies(&tasks[0], &tasks), vec!["draft"]);
        assert!(is_eligible(&tasks[1], &tasks));
    }
}
