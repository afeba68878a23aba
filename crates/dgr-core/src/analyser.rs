//! Dependency queries over a universe of projects.
//!
//! The plan builder only talks to the [`Analyser`] trait. [`InMemoryAnalyser`]
//! answers the queries from a [`ProjectUniverse`], typically loaded from a
//! JSON document produced by scanning a set of repositories.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::{ProjectId, Relation};

/// Read-only dependency information about a set of analysed projects.
pub trait Analyser: Send + Sync {
    /// `None` if the project is not part of the analysis.
    fn current_version(&self, project_id: &ProjectId) -> Option<String>;

    fn relative_path(&self, project_id: &ProjectId) -> String;

    fn is_submodule(&self, project_id: &ProjectId) -> bool;

    /// Direct submodules of a multi module.
    fn submodules(&self, project_id: &ProjectId) -> BTreeSet<ProjectId>;

    fn has_submodules(&self, project_id: &ProjectId) -> bool {
        !self.submodules(project_id).is_empty()
    }

    /// Multi modules containing the project, nearest first.
    fn multi_modules(&self, project_id: &ProjectId) -> Vec<ProjectId>;

    /// Projects depending on `project_id`.
    fn dependents_of(&self, project_id: &ProjectId) -> Vec<Relation>;

    /// `true` if `submodule` is a (nested) submodule of `multi_module`.
    fn is_submodule_of(&self, submodule: &ProjectId, multi_module: &ProjectId) -> bool {
        self.multi_modules(submodule).contains(multi_module)
    }

    fn erroneous_pom_files(&self) -> Vec<String>;

    fn erroneous_projects(&self) -> Vec<String>;

    fn analysed_projects(&self) -> Vec<ProjectId>;
}

/// A dependency declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub id: ProjectId,
    /// `false` if the version is inherited, e.g. from a parent or a BOM.
    #[serde(default = "default_true")]
    pub self_managed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseProject {
    pub id: ProjectId,
    pub version: String,
    #[serde(default)]
    pub relative_path: String,
    /// Direct multi module this project is a submodule of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ProjectId>,
    #[serde(default)]
    pub dependencies: Vec<DeclaredDependency>,
}

/// Everything the in-memory analyser knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUniverse {
    pub projects: Vec<UniverseProject>,
    #[serde(default)]
    pub erroneous_pom_files: Vec<String>,
    #[serde(default)]
    pub erroneous_projects: Vec<String>,
}

impl ProjectUniverse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// [`Analyser`] over a [`ProjectUniverse`].
///
/// Dependencies on projects outside the universe are ignored. A submodule is
/// reported as a dependent of its direct multi module, the way a Maven
/// `<parent>` declaration makes the child depend on the parent.
#[derive(Debug, Clone)]
pub struct InMemoryAnalyser {
    projects: BTreeMap<ProjectId, UniverseProject>,
    /// `dependency → dependent → self managed`
    dependents: BTreeMap<ProjectId, BTreeMap<ProjectId, bool>>,
    submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    erroneous_pom_files: Vec<String>,
    erroneous_projects: Vec<String>,
}

impl InMemoryAnalyser {
    pub fn new(universe: ProjectUniverse) -> Result<Self> {
        let mut projects = BTreeMap::new();
        for project in universe.projects {
            if let Some(duplicate) = projects.insert(project.id.clone(), project) {
                return Err(ReleaseError::InvalidArgument(format!(
                    "project {} is defined more than once",
                    duplicate.id
                )));
            }
        }

        let mut dependents: BTreeMap<ProjectId, BTreeMap<ProjectId, bool>> = BTreeMap::new();
        let mut submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>> = BTreeMap::new();
        for project in projects.values() {
            if let Some(parent) = &project.parent {
                if !projects.contains_key(parent) {
                    return Err(ReleaseError::InvalidArgument(format!(
                        "parent {parent} of project {} is not part of the analysis",
                        project.id
                    )));
                }
                submodules
                    .entry(parent.clone())
                    .or_default()
                    .insert(project.id.clone());
                dependents
                    .entry(parent.clone())
                    .or_default()
                    .insert(project.id.clone(), true);
            }
            for dependency in &project.dependencies {
                if !projects.contains_key(&dependency.id) || dependency.id == project.id {
                    continue;
                }
                let self_managed = dependents
                    .entry(dependency.id.clone())
                    .or_default()
                    .entry(project.id.clone())
                    .or_insert(false);
                *self_managed |= dependency.self_managed;
            }
        }

        let analyser = Self {
            projects,
            dependents,
            submodules,
            erroneous_pom_files: universe.erroneous_pom_files,
            erroneous_projects: universe.erroneous_projects,
        };
        for id in analyser.projects.keys() {
            if analyser.multi_modules(id).contains(id) {
                return Err(ReleaseError::InvalidArgument(format!(
                    "project {id} is its own (transitive) parent"
                )));
            }
        }
        Ok(analyser)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(ProjectUniverse::from_json(json)?)
    }
}

impl Analyser for InMemoryAnalyser {
    fn current_version(&self, project_id: &ProjectId) -> Option<String> {
        self.projects.get(project_id).map(|p| p.version.clone())
    }

    fn relative_path(&self, project_id: &ProjectId) -> String {
        self.projects
            .get(project_id)
            .map(|p| p.relative_path.clone())
            .unwrap_or_default()
    }

    fn is_submodule(&self, project_id: &ProjectId) -> bool {
        self.projects
            .get(project_id)
            .is_some_and(|p| p.parent.is_some())
    }

    fn submodules(&self, project_id: &ProjectId) -> BTreeSet<ProjectId> {
        self.submodules.get(project_id).cloned().unwrap_or_default()
    }

    fn multi_modules(&self, project_id: &ProjectId) -> Vec<ProjectId> {
        let mut multi_modules = Vec::new();
        let mut current = self.projects.get(project_id).and_then(|p| p.parent.as_ref());
        while let Some(parent) = current {
            // guards against a parent cycle, reported by `new`
            if multi_modules.contains(parent) {
                multi_modules.push(parent.clone());
                break;
            }
            multi_modules.push(parent.clone());
            current = self.projects.get(parent).and_then(|p| p.parent.as_ref());
        }
        multi_modules
    }

    fn dependents_of(&self, project_id: &ProjectId) -> Vec<Relation> {
        self.dependents
            .get(project_id)
            .into_iter()
            .flatten()
            .filter_map(|(id, self_managed)| {
                self.projects
                    .get(id)
                    .map(|p| Relation::new(id.clone(), p.version.clone(), *self_managed))
            })
            .collect()
    }

    fn erroneous_pom_files(&self) -> Vec<String> {
        self.erroneous_pom_files.clone()
    }

    fn erroneous_projects(&self) -> Vec<String> {
        self.erroneous_projects.clone()
    }

    fn analysed_projects(&self) -> Vec<ProjectId> {
        self.projects.keys().cloned().collect()
    }
}
