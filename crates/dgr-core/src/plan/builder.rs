//! Builds a [`ReleasePlan`] by walking the dependents of a root project.
//!
//! Projects are visited level by level. Every visited project asks the
//! [`Analyser`] for its dependents, creates or updates their commands and
//! pushes them one level further. When a project turns out to belong to a
//! deeper level than assumed, its level is raised and it is visited again so
//! that its dependents follow. Relations which would close a cycle are
//! dropped and reported: as warning in general, as info if every project of
//! the cycle belongs to the same multi module family since the release plugin
//! bumps the versions of such a family in one go.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use regex::Regex;
use tracing::{debug, info};

use crate::analyser::Analyser;
use crate::domain::command::Command;
use crate::domain::command_state::CommandState;
use crate::domain::config::Config;
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::{Project, ProjectId, Relation};
use crate::domain::release_state::{ReleaseState, TypeOfRun};
use crate::obs;
use crate::plan::level_iterator::LevelIterator;
use crate::plan::release_plan::{ReleasePlan, ReleasePlanParts};
use crate::plan::version::VersionDeterminer;

/// Options of a [`ReleasePlanBuilder`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub release_id: String,
    /// Release commands of matching projects start `Disabled`; matched against
    /// the whole identifier.
    pub disable_release_for: Option<Regex>,
    pub config: Config,
    pub type_of_run: TypeOfRun,
}

impl BuildOptions {
    pub fn new(release_id: impl Into<String>) -> Self {
        Self {
            release_id: release_id.into(),
            disable_release_for: None,
            config: Config::new(),
            type_of_run: TypeOfRun::default(),
        }
    }

    /// Disables the release of every project whose identifier matches `pattern` as a whole.
    pub fn disable_release_for(mut self, pattern: &str) -> Result<Self> {
        self.disable_release_for = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(self)
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_type_of_run(mut self, type_of_run: TypeOfRun) -> Self {
        self.type_of_run = type_of_run;
        self
    }
}

/// `existing dependent → dependency → chain` of the relations dropped because of a cycle.
type Cycles = BTreeMap<ProjectId, BTreeMap<ProjectId, Vec<ProjectId>>>;

pub struct ReleasePlanBuilder {
    options: BuildOptions,
    versions: VersionDeterminer,
}

impl ReleasePlanBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            versions: VersionDeterminer,
        }
    }

    /// Builds the plan releasing `root` together with all its (transitive) dependents.
    pub fn build(&self, root: &ProjectId, analyser: &dyn Analyser) -> Result<ReleasePlan> {
        let Some(current_version) = analyser.current_version(root) else {
            let analysed = analyser
                .analysed_projects()
                .iter()
                .map(ProjectId::identifier)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ReleaseError::InvalidArgument(format!(
                "can only release a project which is part of the analysis, given: {root}, analysed projects: {analysed}"
            )));
        };
        if analyser.is_submodule(root) {
            let multi_modules = analyser
                .multi_modules(root)
                .iter()
                .map(ProjectId::identifier)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ReleaseError::InvalidArgument(format!(
                "cannot release a submodule, {root} is part of the multi module hierarchy: {multi_modules}"
            )));
        }

        let root_project = Project {
            id: root.clone(),
            is_submodule: false,
            release_version: self.versions.release_version(&current_version),
            level: 0,
            commands: vec![self.release_command(analyser, root, &current_version, CommandState::Ready)],
            relative_path: analyser.relative_path(root),
            current_version,
        };

        let mut state = BuildState::new(analyser, self.versions, root_project);
        state.create_dependents()?;

        let mut warnings = report_cycles(
            &state.cyclic_dependents,
            "has one or more cyclic dependencies. The first relation of each chain was ignored, you need to resolve it manually",
        );
        warnings.extend(analyser.erroneous_pom_files());
        warnings.extend(analyser.erroneous_projects());
        let infos = report_cycles(
            &state.inter_module_cyclic_dependents,
            "has one or more cyclic dependencies within its multi module family. The release plugin might handle them depending on where the relations are defined, yet it might also fail; you should reconsider the design",
        );

        let projects = state.projects;
        let submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>> = state
            .submodules
            .into_iter()
            .map(|(id, subs)| {
                let subs: BTreeSet<ProjectId> =
                    subs.into_iter().filter(|s| projects.contains_key(s)).collect();
                (id, subs)
            })
            .filter(|(id, subs)| !subs.is_empty() && projects.contains_key(id))
            .collect();

        let mut plan = ReleasePlan::from_parts(ReleasePlanParts {
            release_id: self.options.release_id.clone(),
            state: ReleaseState::Ready,
            type_of_run: self.options.type_of_run,
            root_project_id: root.clone(),
            projects,
            submodules,
            dependents: state.dependents,
            warnings,
            infos,
            config: self.options.config.clone(),
        })?;
        self.disable_projects(&mut plan)?;
        obs::emit_plan_built(&plan);
        Ok(plan)
    }

    fn release_command(
        &self,
        analyser: &dyn Analyser,
        project_id: &ProjectId,
        current_version: &str,
        state: CommandState,
    ) -> Command {
        Command::release_plugin(
            analyser.has_submodules(project_id),
            self.versions.next_dev_version(current_version),
            state,
        )
    }

    fn disable_projects(&self, plan: &mut ReleasePlan) -> Result<()> {
        let Some(regex) = &self.options.disable_release_for else {
            return Ok(());
        };
        let mut disabled = Vec::new();
        let matching: Vec<(ProjectId, Option<usize>)> = plan
            .projects()
            .filter(|p| regex.is_match(p.id.identifier()))
            .map(|p| {
                let first_release_command = p
                    .commands
                    .iter()
                    .position(|c| c.is_release_command() && c.state != CommandState::Disabled);
                (p.id.clone(), first_release_command)
            })
            .collect();
        for (project_id, index) in matching {
            // later release commands wait on the disabled one anyway
            if let Some(index) = index {
                plan.transition_command(&project_id, index, CommandState::Disabled)?;
            }
            disabled.push(project_id.identifier().to_string());
        }
        if !disabled.is_empty() {
            disabled.sort();
            info!(
                regex = %regex.as_str(),
                projects = %disabled.join(", "),
                "disabled release commands matching disable_release_for"
            );
        }
        Ok(())
    }
}

fn report_cycles(cycles: &Cycles, message: &str) -> Vec<String> {
    cycles
        .iter()
        .map(|(project_id, chains)| {
            let chains = chains
                .iter()
                .map(|(dependency, chain)| {
                    let chain = chain
                        .iter()
                        .map(ProjectId::identifier)
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    format!("-> {chain} -> {dependency}")
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("Project {project_id} {message}:\n{chains}")
        })
        .collect()
}

/// Mutable state while walking the dependents graph.
///
/// `dependency_*` is the project currently visited, `relation` the dependent
/// currently processed.
struct BuildState<'a> {
    analyser: &'a dyn Analyser,
    versions: VersionDeterminer,
    projects: BTreeMap<ProjectId, Project>,
    submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    dependents: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    cyclic_dependents: Cycles,
    inter_module_cyclic_dependents: Cycles,
    level_iterator: LevelIterator<ProjectId, ()>,
    dependency_id: ProjectId,
    dependency_level: u32,
    relation: Relation,
}

impl<'a> BuildState<'a> {
    fn new(analyser: &'a dyn Analyser, versions: VersionDeterminer, root: Project) -> Self {
        let root_id = root.id.clone();
        let relation = Relation::new(root_id.clone(), root.current_version.clone(), false);
        Self {
            analyser,
            versions,
            projects: BTreeMap::from([(root_id.clone(), root)]),
            submodules: BTreeMap::new(),
            dependents: BTreeMap::from([(root_id.clone(), BTreeSet::new())]),
            cyclic_dependents: Cycles::new(),
            inter_module_cyclic_dependents: Cycles::new(),
            level_iterator: LevelIterator::new((root_id.clone(), ())),
            dependency_id: root_id,
            dependency_level: 0,
            relation,
        }
    }

    fn create_dependents(&mut self) -> Result<()> {
        while let Some((project_id, ())) = self.level_iterator.next() {
            let level = self.project(&project_id)?.level;
            self.submodules
                .insert(project_id.clone(), self.analyser.submodules(&project_id));
            self.create_commands_for_dependents(project_id, level)?;
        }
        Ok(())
    }

    fn create_commands_for_dependents(&mut self, dependency_id: ProjectId, level: u32) -> Result<()> {
        self.init_dependency(dependency_id, level);
        debug!(dependency = %self.dependency_id, level, "visiting dependents");

        for relation in self.analyser.dependents_of(&self.dependency_id) {
            self.relation = relation;
            if self.is_dependency_submodule_of_relation() {
                continue;
            }
            let relation_id = self.relation.id.clone();
            match self.projects.get(&relation_id).map(|p| p.level) {
                None => self.init_dependent_inclusive_commands()?,
                Some(level) if level < self.anticipated_level() => {
                    self.check_for_cyclic_and_update_if_ok(&relation_id)?;
                }
                Some(_) => self.update_commands_add_dependent_and_update_multi_module(&relation_id)?,
            }
        }
        Ok(())
    }

    fn init_dependency(&mut self, dependency_id: ProjectId, level: u32) {
        self.dependency_id = dependency_id;
        self.dependency_level = level;
    }

    fn init_dependent_inclusive_commands(&mut self) -> Result<()> {
        let dependent_id = self.init_dependent();
        self.update_commands_add_dependent_and_update_multi_module(&dependent_id)
    }

    /// Creates the project of the current relation and schedules it for the next level.
    fn init_dependent(&mut self) -> ProjectId {
        let relation = self.relation.clone();
        let is_submodule = self.analyser.is_submodule(&relation.id);
        let commands = if is_submodule {
            // released by the release command of its multi module
            Vec::new()
        } else {
            vec![Command::release_plugin(
                self.analyser.has_submodules(&relation.id),
                self.versions.next_dev_version(&relation.current_version),
                CommandState::waiting_for(self.dependency_id.clone()),
            )]
        };
        let project = Project {
            id: relation.id.clone(),
            is_submodule,
            release_version: self.versions.release_version(&relation.current_version),
            level: self.determine_level(),
            commands,
            relative_path: self.analyser.relative_path(&relation.id),
            current_version: relation.current_version,
        };
        self.dependents.entry(relation.id.clone()).or_default();
        self.projects.insert(relation.id.clone(), project);
        self.level_iterator.add_to_next_level((relation.id.clone(), ()));
        relation.id
    }

    /// Returns `false` if the relation was dropped because it would close a cycle.
    fn check_for_cyclic_and_update_if_ok(&mut self, existing_id: &ProjectId) -> Result<bool> {
        self.analyse_cycles(existing_id)?;
        if self.has_relation_cycle_to_dependency() {
            debug!(
                dependent = %existing_id,
                dependency = %self.dependency_id,
                "ignoring relation, it would introduce a cycle"
            );
            return Ok(false);
        }
        self.update_level_if_necessary_and_revisit(existing_id)?;
        self.update_commands_add_dependent_and_update_multi_module(existing_id)?;
        Ok(true)
    }

    fn update_level_if_necessary_and_revisit(&mut self, dependent_id: &ProjectId) -> Result<()> {
        let level = self.determine_level();
        let dependent = self.project_mut(dependent_id)?;
        if dependent.level != level {
            dependent.level = level;
            // its dependents need to follow
            self.level_iterator
                .remove_if_on_same_level_and_re_add_on_next((dependent_id.clone(), ()));
        }
        Ok(())
    }

    fn update_commands_add_dependent_and_update_multi_module(
        &mut self,
        dependent_id: &ProjectId,
    ) -> Result<()> {
        self.add_and_update_commands_of_dependent(dependent_id)?;
        self.add_to_dependents_of_dependency(dependent_id)?;
        self.update_multi_module_if_necessary(dependent_id)
    }

    fn add_to_dependents_of_dependency(&mut self, dependent_id: &ProjectId) -> Result<()> {
        self.dependents
            .get_mut(&self.dependency_id)
            .ok_or_else(|| {
                ReleaseError::IllegalState(format!(
                    "{} was not found in dependents",
                    self.dependency_id
                ))
            })?
            .insert(dependent_id.clone());
        Ok(())
    }

    fn add_and_update_commands_of_dependent(&mut self, dependent_id: &ProjectId) -> Result<()> {
        // an inherited version is updated by the project managing it
        if !self.relation.is_dependency_version_self_managed {
            return Ok(());
        }
        // only the level changed
        if self.is_relation_already_dependent_of_dependency_and_waits()? {
            return Ok(());
        }

        let dependency_id = self.dependency_id.clone();
        let is_relation_submodule = self.analyser.is_submodule(&self.relation.id);
        let not_in_same_circle = self.is_relation_not_in_same_multi_module_circle();
        let dependent = self.project_mut(dependent_id)?;
        if !is_relation_submodule {
            add_dependency_to_release_commands(dependent, &dependency_id)?;
        }
        // within one multi module family the release plugin updates the versions
        let has_update_command = dependent
            .commands
            .iter()
            .any(|c| c.updated_dependency() == Some(&dependency_id));
        if not_in_same_circle && !has_update_command {
            dependent.commands.insert(
                0,
                Command::update_dependency(
                    dependency_id.clone(),
                    CommandState::waiting_for(dependency_id),
                ),
            );
        }
        Ok(())
    }

    /// Pulls the top multi module of a touched submodule into the analysis.
    fn update_multi_module_if_necessary(&mut self, dependent_id: &ProjectId) -> Result<()> {
        let dependent = self.project(dependent_id)?;
        if !dependent.is_submodule {
            return Ok(());
        }
        let dependent_level = dependent.level;
        let Some(top_id) = self.analyser.multi_modules(&self.relation.id).pop() else {
            return Err(ReleaseError::IllegalState(format!(
                "submodule {} has no multi module",
                self.relation.id
            )));
        };

        match self.projects.get(&top_id).map(|p| (p.level, p.current_version.clone())) {
            None if self.is_not_dependent_of_dependency(&top_id) => {
                // not part of the dependents graph, yet its release command has to wait
                let version = self.analyser.current_version(&top_id).ok_or_else(|| {
                    ReleaseError::IllegalState(format!(
                        "multi module {top_id} of {dependent_id} is not part of the analysis"
                    ))
                })?;
                let saved = std::mem::replace(
                    &mut self.relation,
                    Relation::new(top_id.clone(), version, false),
                );
                let top_id = self.init_dependent();
                let added = self.add_to_dependents_of_dependency(&top_id);
                self.relation = saved;
                added
            }
            Some((top_level, top_version)) if top_level < dependent_level => {
                let saved = std::mem::replace(
                    &mut self.relation,
                    Relation::new(top_id.clone(), top_version, false),
                );
                let no_cycle = self.check_for_cyclic_and_update_if_ok(&top_id);
                let wait_on_dependency = matches!(no_cycle, Ok(true))
                    && self.is_relation_not_in_same_multi_module_circle();
                self.relation = saved;
                if !no_cycle? {
                    // updating the multi module would close a cycle, adjust the submodule instead
                    let saved_dependency = (self.dependency_id.clone(), self.dependency_level);
                    self.init_dependency(top_id, top_level);
                    let updated = self.update_level_if_necessary_and_revisit(dependent_id);
                    self.init_dependency(saved_dependency.0, saved_dependency.1);
                    return updated;
                }
                if wait_on_dependency {
                    self.add_dependency_to_waiting_release_commands(&top_id)?;
                }
                Ok(())
            }
            Some((_, top_version)) if top_id != self.dependency_id => {
                // already on the submodule's level or deeper, only the relation is missing
                let saved = std::mem::replace(
                    &mut self.relation,
                    Relation::new(top_id.clone(), top_version, false),
                );
                let outside_family = self.is_relation_not_in_same_multi_module_circle();
                let cyclic = if outside_family {
                    self.analyse_cycles(&top_id)
                        .map(|()| self.has_relation_cycle_to_dependency())
                } else {
                    Ok(false)
                };
                self.relation = saved;
                if !outside_family || cyclic? {
                    return Ok(());
                }
                self.add_to_dependents_of_dependency(&top_id)?;
                self.add_dependency_to_waiting_release_commands(&top_id)
            }
            _ => Ok(()),
        }
    }

    fn add_dependency_to_waiting_release_commands(&mut self, project_id: &ProjectId) -> Result<()> {
        let dependency_id = self.dependency_id.clone();
        let project = self.project_mut(project_id)?;
        for command in project.commands.iter_mut().filter(|c| c.is_release_command()) {
            if let CommandState::Waiting { dependencies } = &mut command.state {
                dependencies.insert(dependency_id.clone());
            }
        }
        Ok(())
    }

    /// Breadth-first search from `existing_id` back to the current dependency.
    fn analyse_cycles(&mut self, existing_id: &ProjectId) -> Result<()> {
        let dependency_id = self.dependency_id.clone();
        let mut visited = HashSet::new();
        let mut to_visit = VecDeque::from([(
            existing_id.clone(),
            vec![dependency_id.clone(), existing_id.clone()],
        )]);

        while let Some((dependent_id, branch)) = to_visit.pop_front() {
            visited.insert(dependent_id.clone());
            let dependents = self.dependents.get(&dependent_id).cloned().ok_or_else(|| {
                ReleaseError::IllegalState(format!("{dependent_id} was not found in dependents"))
            })?;
            for next in dependents {
                if next == dependency_id {
                    let within_family = self.is_within_one_family(&branch);
                    let cycles = if within_family {
                        &mut self.inter_module_cyclic_dependents
                    } else {
                        &mut self.cyclic_dependents
                    };
                    cycles
                        .entry(existing_id.clone())
                        .or_default()
                        .insert(dependency_id.clone(), branch.clone());
                    // cycles within a multi module family might be fine, keep looking for others
                    if !within_family {
                        return Ok(());
                    }
                } else if !visited.contains(&next) {
                    let mut next_branch = branch.clone();
                    next_branch.push(next.clone());
                    match to_visit.iter_mut().find(|(id, _)| *id == next) {
                        Some(pending) => pending.1 = next_branch,
                        None => to_visit.push_back((next, next_branch)),
                    }
                }
            }
        }
        Ok(())
    }

    /// `true` if all projects of `chain` share the same top multi module.
    fn is_within_one_family(&self, chain: &[ProjectId]) -> bool {
        let mut families = chain.iter().map(|id| {
            self.analyser
                .multi_modules(id)
                .pop()
                .unwrap_or_else(|| id.clone())
        });
        let Some(first) = families.next() else {
            return false;
        };
        families.all(|family| family == first)
    }

    fn has_relation_cycle_to_dependency(&self) -> bool {
        let contains = |cycles: &Cycles| {
            cycles
                .get(&self.relation.id)
                .is_some_and(|chains| chains.contains_key(&self.dependency_id))
        };
        contains(&self.cyclic_dependents) || contains(&self.inter_module_cyclic_dependents)
    }

    fn is_relation_already_dependent_of_dependency_and_waits(&self) -> Result<bool> {
        let is_dependent = self
            .dependents
            .get(&self.dependency_id)
            .is_some_and(|d| d.contains(&self.relation.id));
        if !is_dependent {
            return Ok(false);
        }
        Ok(self.project(&self.relation.id)?.commands.iter().any(|c| {
            matches!(&c.state, CommandState::Waiting { dependencies } if dependencies.contains(&self.dependency_id))
        }))
    }

    fn is_not_dependent_of_dependency(&self, project_id: &ProjectId) -> bool {
        !self
            .analyser
            .dependents_of(&self.dependency_id)
            .iter()
            .any(|r| r.id == *project_id)
    }

    /// The level the current relation would get as dependent of the current dependency.
    fn anticipated_level(&self) -> u32 {
        self.dependency_level + 1
    }

    fn determine_level(&self) -> u32 {
        if self.is_relation_not_in_same_multi_module_circle() {
            self.anticipated_level()
        } else {
            self.dependency_level
        }
    }

    fn is_dependency_submodule_of_relation(&self) -> bool {
        self.analyser
            .is_submodule_of(&self.dependency_id, &self.relation.id)
    }

    /// `false` if relation and dependency are submodules of one another or
    /// share a common multi module.
    fn is_relation_not_in_same_multi_module_circle(&self) -> bool {
        let relation_id = &self.relation.id;
        if self.analyser.is_submodule_of(relation_id, &self.dependency_id)
            || self.is_dependency_submodule_of_relation()
        {
            return false;
        }
        let multi_modules_of_dependency = self.analyser.multi_modules(&self.dependency_id);
        multi_modules_of_dependency.is_empty()
            || !self
                .analyser
                .multi_modules(relation_id)
                .iter()
                .any(|m| multi_modules_of_dependency.contains(m))
    }

    fn project(&self, project_id: &ProjectId) -> Result<&Project> {
        self.projects.get(project_id).ok_or_else(|| {
            ReleaseError::IllegalState(format!("{project_id} was not found in projects"))
        })
    }

    fn project_mut(&mut self, project_id: &ProjectId) -> Result<&mut Project> {
        self.projects.get_mut(project_id).ok_or_else(|| {
            ReleaseError::IllegalState(format!("{project_id} was not found in projects"))
        })
    }
}

fn add_dependency_to_release_commands(project: &mut Project, dependency_id: &ProjectId) -> Result<()> {
    for command in project.commands.iter_mut().filter(|c| c.is_release_command()) {
        match &mut command.state {
            CommandState::Waiting { dependencies } => {
                dependencies.insert(dependency_id.clone());
            }
            CommandState::Disabled => {}
            other => {
                return Err(ReleaseError::IllegalState(format!(
                    "release command of {} has to be Waiting or Disabled, found: {other}",
                    project.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::{DeclaredDependency, InMemoryAnalyser, ProjectUniverse, UniverseProject};

    fn universe(projects: &[(&str, Option<&str>, &[&str])]) -> InMemoryAnalyser {
        InMemoryAnalyser::new(ProjectUniverse {
            projects: projects
                .iter()
                .map(|(id, parent, deps)| UniverseProject {
                    id: ProjectId::new(*id),
                    version: "1.0.0-SNAPSHOT".to_string(),
                    relative_path: format!("{id}/"),
                    parent: parent.map(ProjectId::new),
                    dependencies: deps
                        .iter()
                        .map(|d| DeclaredDependency {
                            id: ProjectId::new(*d),
                            self_managed: true,
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        })
        .expect("valid universe")
    }

    fn build(analyser: &InMemoryAnalyser, root: &str) -> Result<ReleasePlan> {
        ReleasePlanBuilder::new(BuildOptions::new("test")).build(&ProjectId::new(root), analyser)
    }

    #[test]
    fn test_root_only() {
        let analyser = universe(&[("root", None, &[])]);
        let plan = build(&analyser, "root").unwrap();
        let root = plan.root_project().unwrap();
        assert_eq!(root.level, 0);
        assert_eq!(root.release_version, "1.0.0");
        assert_eq!(root.commands.len(), 1);
        assert_eq!(root.commands[0].state, CommandState::Ready);
        assert_eq!(root.commands[0].next_dev_version(), Some("1.0.1-SNAPSHOT"));
        assert!(plan.warnings().is_empty());
    }

    #[test]
    fn test_rejects_unknown_root() {
        let analyser = universe(&[("root", None, &[])]);
        let err = build(&analyser, "other").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidArgument(ref m) if m.contains("root")));
    }

    #[test]
    fn test_rejects_submodule_root() {
        let analyser = universe(&[("multi", None, &[]), ("sub", Some("multi"), &[])]);
        let err = build(&analyser, "sub").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidArgument(ref m) if m.contains("multi")));
    }

    #[test]
    fn test_update_dependency_precedes_release() {
        let analyser = universe(&[("root", None, &[]), ("a", None, &["root"])]);
        let plan = build(&analyser, "root").unwrap();
        let a = plan.project(&ProjectId::new("a")).unwrap();
        assert_eq!(a.level, 1);
        assert_eq!(a.commands.len(), 2);
        assert_eq!(a.commands[0].updated_dependency(), Some(&ProjectId::new("root")));
        assert_eq!(
            a.commands[1].state,
            CommandState::waiting_for(ProjectId::new("root"))
        );
    }

    #[test]
    fn test_inherited_version_needs_no_update_command() {
        let analyser = InMemoryAnalyser::new(ProjectUniverse {
            projects: vec![
                UniverseProject {
                    id: ProjectId::new("root"),
                    version: "2.0-SNAPSHOT".to_string(),
                    relative_path: String::new(),
                    parent: None,
                    dependencies: vec![],
                },
                UniverseProject {
                    id: ProjectId::new("a"),
                    version: "1.0-SNAPSHOT".to_string(),
                    relative_path: String::new(),
                    parent: None,
                    dependencies: vec![DeclaredDependency {
                        id: ProjectId::new("root"),
                        self_managed: false,
                    }],
                },
            ],
            ..Default::default()
        })
        .unwrap();
        let plan = build(&analyser, "root").unwrap();
        let a = plan.project(&ProjectId::new("a")).unwrap();
        assert_eq!(a.commands.len(), 1);
        assert!(a.commands[0].is_release_command());
        assert!(plan
            .dependents(&ProjectId::new("root"))
            .unwrap()
            .contains(&ProjectId::new("a")));
    }

    #[test]
    fn test_submodule_has_no_own_release_command() {
        let analyser = universe(&[
            ("root", None, &[]),
            ("multi", None, &["root"]),
            ("sub", Some("multi"), &["root"]),
        ]);
        let plan = build(&analyser, "root").unwrap();
        let multi = plan.project(&ProjectId::new("multi")).unwrap();
        let sub = plan.project(&ProjectId::new("sub")).unwrap();
        assert!(matches!(
            multi.commands.last().map(|c| &c.kind),
            Some(crate::domain::command::CommandKind::MultiModuleReleasePlugin { .. })
        ));
        assert!(sub.is_submodule);
        assert!(!sub.has_release_command());
        assert_eq!(sub.commands.len(), 1);
        assert_eq!(sub.level, multi.level);
        assert!(plan
            .submodules(&ProjectId::new("multi"))
            .unwrap()
            .contains(&ProjectId::new("sub")));
    }

    #[test]
    fn test_disable_release_for_matches_whole_identifier() {
        let analyser = universe(&[
            ("root", None, &[]),
            ("lib", None, &["root"]),
            ("lib-extra", None, &["root"]),
        ]);
        let options = BuildOptions::new("test").disable_release_for("lib").unwrap();
        let plan = ReleasePlanBuilder::new(options)
            .build(&ProjectId::new("root"), &analyser)
            .unwrap();
        let lib = plan.project(&ProjectId::new("lib")).unwrap();
        let extra = plan.project(&ProjectId::new("lib-extra")).unwrap();
        assert_eq!(lib.commands[1].state, CommandState::Disabled);
        assert_ne!(extra.commands[1].state, CommandState::Disabled);
    }

    #[test]
    fn test_invalid_disable_pattern() {
        assert!(matches!(
            BuildOptions::new("test").disable_release_for("(unclosed"),
            Err(ReleaseError::InvalidRegex(_))
        ));
    }
}
