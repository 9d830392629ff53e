//! Navigation orchestrator
//!
//! Turns a resolved [`CanonicalPath`] into the ordered stack operations that
//! put the user on that screen. Whatever the origin, a link to a message ends
//! with the back stack `message -> student -> home`, so the user can always
//! navigate up instead of being stranded on the message screen.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::path::CanonicalPath;
use crate::resolver::LinkKind;

/// Where a link came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkOrigin {
    Universal,
    Scheme,
    InApp,
}

impl LinkOrigin {
    pub fn of(kind: &LinkKind) -> Self {
        match kind {
            LinkKind::Direct(_) => LinkOrigin::InApp,
            LinkKind::Scheme(_) | LinkKind::DevTunnel(_) => LinkOrigin::Scheme,
            LinkKind::Universal(_) => LinkOrigin::Universal,
        }
    }
}

/// How many students the device knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentCount {
    /// Home is this student's screen
    One(i64),
    Many,
}

impl StudentCount {
    pub fn from_ids(ids: &[i64]) -> Self {
        match ids {
            [only] => StudentCount::One(*only),
            _ => StudentCount::Many,
        }
    }
}

/// How deep a canonical path sits in the screen hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetDepth {
    Root,
    Student,
    Message,
}

impl TargetDepth {
    pub fn of(path: &CanonicalPath) -> Option<Self> {
        match path {
            CanonicalPath::Root | CanonicalPath::Settings => Some(TargetDepth::Root),
            CanonicalPath::Student { .. } => Some(TargetDepth::Student),
            CanonicalPath::Message { .. } => Some(TargetDepth::Message),
            CanonicalPath::Error => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationContext {
    pub cold_start: bool,
    pub origin: LinkOrigin,
    pub students: StudentCount,
}

/// One stack operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    /// Reset the whole stack to this screen
    Replace(CanonicalPath),
    /// Push a screen on top of the current one
    Push(CanonicalPath),
    /// Let the previous screen mount before the next push
    Wait(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPlan {
    steps: Vec<NavStep>,
}

impl NavigationPlan {
    pub fn steps(&self) -> &[NavStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Stack produced by replaying the plan on top of `current`
    pub fn apply(&self, current: &[CanonicalPath]) -> Vec<CanonicalPath> {
        let mut stack = current.to_vec();
        for step in &self.steps {
            match step {
                NavStep::Replace(path) => {
                    stack.clear();
                    stack.push(*path);
                }
                NavStep::Push(path) => stack.push(*path),
                NavStep::Wait(_) => {}
            }
        }
        stack
    }

    /// Screen the user ends up on
    pub fn destination(&self) -> Option<CanonicalPath> {
        self.steps.iter().rev().find_map(|step| match step {
            NavStep::Replace(path) | NavStep::Push(path) => Some(*path),
            NavStep::Wait(_) => None,
        })
    }
}

/// Builds deterministic navigation plans
#[derive(Debug, Clone)]
pub struct NavigationOrchestrator {
    mount_delay: Duration,
}

impl Default for NavigationOrchestrator {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl NavigationOrchestrator {
    pub fn new(mount_delay: Duration) -> Self {
        Self { mount_delay }
    }

    pub fn plan(&self, path: CanonicalPath, ctx: &NavigationContext) -> NavigationPlan {
        let screens = screens_for(path, ctx.students);
        let Some((home, rest)) = screens.split_first() else {
            return NavigationPlan::default();
        };

        let mut steps = Vec::with_capacity(screens.len() * 2);

        // A warm in-app link already has home mounted underneath
        if !ctx.cold_start && ctx.origin == LinkOrigin::InApp && !rest.is_empty() {
            steps.extend(rest.iter().map(|p| NavStep::Push(*p)));
            return NavigationPlan { steps };
        }

        let needs_mount = ctx.cold_start || ctx.origin == LinkOrigin::Universal;
        steps.push(NavStep::Replace(*home));
        for screen in rest {
            if needs_mount {
                steps.push(NavStep::Wait(self.mount_delay));
            }
            steps.push(NavStep::Push(*screen));
        }

        NavigationPlan { steps }
    }
}

/// Full stack, bottom first, that should exist once `path` is shown
fn screens_for(path: CanonicalPath, students: StudentCount) -> Vec<CanonicalPath> {
    let home = match students {
        StudentCount::One(student_id) => CanonicalPath::Student { student_id },
        StudentCount::Many => CanonicalPath::Root,
    };

    match path {
        CanonicalPath::Error => vec![],
        CanonicalPath::Root => vec![home],
        CanonicalPath::Settings => vec![home, CanonicalPath::Settings],
        CanonicalPath::Student { .. } if home == path => vec![home],
        CanonicalPath::Student { .. } => vec![CanonicalPath::Root, path],
        CanonicalPath::Message { student_id, .. } => {
            let student = CanonicalPath::Student { student_id };
            if home == student {
                vec![home, path]
            } else {
                vec![CanonicalPath::Root, student, path]
            }
        }
    }
}
