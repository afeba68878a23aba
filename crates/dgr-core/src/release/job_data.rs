//! Turns commands into the jobs executing them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::command::{Command, CommandKind};
use crate::domain::config::{self, Config, ConfigKey};
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::{Project, ProjectId};
use crate::plan::ReleasePlan;

/// Everything a [`crate::release::JobExecutor`] needs to run one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutionData {
    /// Human readable name, used in logs and errors.
    pub job_name: String,
    /// Url of the job, ending with `/`; build urls are `{job_base_url}{number}/`.
    pub job_base_url: String,
    pub parameters: Vec<(String, String)>,
}

impl JobExecutionData {
    pub fn build_url(&self, build_number: u64) -> String {
        format!("{}{build_number}/", self.job_base_url)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Extracts the build number from a build url of the given job.
pub fn extract_build_number(
    build_url: &str,
    job: &JobExecutionData,
    project_id: &ProjectId,
    index: usize,
    command: &Command,
) -> Result<u64> {
    build_url
        .strip_prefix(&job.job_base_url)
        .and_then(|rest| rest.split('/').next())
        .and_then(|segment| segment.parse::<u64>().ok())
        .ok_or_else(|| ReleaseError::CorruptBuildUrl {
            build_url: build_url.to_string(),
            job_base_url: job.job_base_url.clone(),
            project_id: project_id.clone(),
            index,
            command_title: command.title(),
        })
}

pub trait JobExecutionDataFactory: Send + Sync {
    fn create(&self, plan: &ReleasePlan, project: &Project, command: &Command)
        -> Result<JobExecutionData>;
}

/// Release parameter names of a job triggered with plain build parameters.
#[derive(Debug, Clone)]
struct BuildWithParamFormat {
    release_version: String,
    next_dev_version: String,
}

/// [`JobExecutionDataFactory`] driven by the config entries of a release plan.
#[derive(Debug, Clone)]
pub struct ConfiguredJobDataFactory {
    default_base_url: String,
    update_dependency_job: String,
    commit_prefix: String,
    remote_regex: Vec<(Regex, String)>,
    job_mapping: Vec<(String, String)>,
    regex_params: Vec<(Regex, Vec<(String, String)>)>,
    build_with_param_jobs: Vec<(Regex, BuildWithParamFormat)>,
}

impl ConfiguredJobDataFactory {
    /// Fails with [`ReleaseError::MissingConfig`] if a required entry is missing.
    pub fn new(default_base_url: impl Into<String>, config: &Config) -> Result<Self> {
        let update_dependency_job = config::require(config, ConfigKey::UpdateDependencyJob)?;
        let remote_regex = config::require(config, ConfigKey::RemoteRegex)?;
        let commit_prefix = config::require(config, ConfigKey::CommitPrefix)?;
        let optional = |key: ConfigKey| config.get(&key).map(String::as_str).unwrap_or_default();

        Ok(Self {
            default_base_url: default_base_url.into(),
            update_dependency_job: with_trailing_slash(update_dependency_job),
            commit_prefix: commit_prefix.to_string(),
            remote_regex: parse_regex_entries(ConfigKey::RemoteRegex, remote_regex, |value| {
                Ok(value.to_string())
            })?,
            job_mapping: parse_job_mapping(optional(ConfigKey::JobMapping))?,
            regex_params: parse_regex_entries(
                ConfigKey::RegexParams,
                optional(ConfigKey::RegexParams),
                parse_params,
            )?,
            build_with_param_jobs: parse_regex_entries(
                ConfigKey::BuildWithParamJobs,
                optional(ConfigKey::BuildWithParamJobs),
                parse_build_with_param_format,
            )?,
        })
    }

    fn update_dependency(
        &self,
        plan: &ReleasePlan,
        project: &Project,
        dependency_id: &ProjectId,
    ) -> Result<JobExecutionData> {
        let dependency = plan.project(dependency_id)?;
        Ok(JobExecutionData {
            job_name: format!("update dependency of {}", project.id),
            job_base_url: self.update_dependency_job.clone(),
            parameters: vec![
                param("pathToProject", &project.relative_path),
                param("dependency", dependency.id.identifier()),
                param("newVersion", &dependency.release_version),
                param("commitPrefix", &self.commit_prefix),
                param("releaseId", plan.release_id()),
            ],
        })
    }

    fn release(&self, project: &Project, next_dev_version: &str) -> JobExecutionData {
        let identifier = project.id.identifier();
        let base_url = first_match(&self.remote_regex, identifier)
            .map(String::as_str)
            .unwrap_or(&self.default_base_url);
        let job_name = self
            .job_mapping
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, job)| job.as_str())
            .unwrap_or_else(|| project.id.artifact_id());

        let (release_param, next_dev_param) = match first_match(&self.build_with_param_jobs, identifier) {
            Some(format) => (format.release_version.as_str(), format.next_dev_version.as_str()),
            None => ("releaseVersion", "developmentVersion"),
        };
        let mut parameters = vec![
            param(release_param, &project.release_version),
            param(next_dev_param, next_dev_version),
        ];
        parameters.extend(
            self.regex_params
                .iter()
                .filter(|(regex, _)| regex.is_match(identifier))
                .flat_map(|(_, params)| params.iter().cloned()),
        );

        JobExecutionData {
            job_name: format!("release {identifier}"),
            job_base_url: format!("{}/job/{job_name}/", base_url.trim_end_matches('/')),
            parameters,
        }
    }
}

impl JobExecutionDataFactory for ConfiguredJobDataFactory {
    fn create(
        &self,
        plan: &ReleasePlan,
        project: &Project,
        command: &Command,
    ) -> Result<JobExecutionData> {
        match &command.kind {
            CommandKind::UpdateDependency { dependency } => {
                self.update_dependency(plan, project, dependency)
            }
            CommandKind::ReleasePlugin { next_dev_version }
            | CommandKind::MultiModuleReleasePlugin { next_dev_version } => {
                Ok(self.release(project, next_dev_version))
            }
        }
    }
}

fn param(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

fn first_match<'a, T>(entries: &'a [(Regex, T)], identifier: &str) -> Option<&'a T> {
    entries
        .iter()
        .find(|(regex, _)| regex.is_match(identifier))
        .map(|(_, value)| value)
}

fn invalid_entry(key: ConfigKey, entry: &str, expected: &str) -> ReleaseError {
    ReleaseError::InvalidArgument(format!(
        "invalid {key} entry `{entry}`, expected {expected}"
    ))
}

/// Parses `regex#value` entries; the regex has to match the whole identifier.
fn parse_regex_entries<T>(
    key: ConfigKey,
    value: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Vec<(Regex, T)>> {
    config::entries(value)
        .map(|entry| {
            let (pattern, rest) = entry
                .split_once('#')
                .ok_or_else(|| invalid_entry(key, entry, "regex#value"))?;
            let regex = Regex::new(&format!("^(?:{pattern})$"))?;
            Ok((regex, parse(rest)?))
        })
        .collect()
}

fn parse_job_mapping(value: &str) -> Result<Vec<(String, String)>> {
    config::entries(value)
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(id, job)| (id.trim().to_string(), job.trim().to_string()))
                .ok_or_else(|| invalid_entry(ConfigKey::JobMapping, entry, "identifier=jobName"))
        })
        .collect()
}

fn parse_params(value: &str) -> Result<Vec<(String, String)>> {
    value
        .split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.split_once('=')
                .map(|(n, v)| param(n.trim(), v.trim()))
                .ok_or_else(|| invalid_entry(ConfigKey::RegexParams, p, "name=value"))
        })
        .collect()
}

fn parse_build_with_param_format(value: &str) -> Result<BuildWithParamFormat> {
    match value.split_once(';') {
        Some((release, next_dev)) if !release.trim().is_empty() && !next_dev.trim().is_empty() => {
            Ok(BuildWithParamFormat {
                release_version: release.trim().to_string(),
                next_dev_version: next_dev.trim().to_string(),
            })
        }
        _ => Err(invalid_entry(
            ConfigKey::BuildWithParamJobs,
            value,
            "releaseVersionParam;nextDevVersionParam",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::domain::command_state::CommandState;
    use crate::domain::release_state::{ReleaseState, TypeOfRun};
    use crate::plan::ReleasePlanParts;

    fn config(extra: &[(ConfigKey, &str)]) -> Config {
        let mut config = Config::new();
        config.insert(ConfigKey::UpdateDependencyJob, "https://ci/job/update-dependency".to_string());
        config.insert(ConfigKey::RemoteRegex, "com\\.other:.*#https://other-ci".to_string());
        config.insert(ConfigKey::CommitPrefix, "[DGR]".to_string());
        for (key, value) in extra {
            config.insert(*key, value.to_string());
        }
        config
    }

    fn project(id: &str, commands: Vec<Command>) -> Project {
        Project {
            id: ProjectId::new(id),
            is_submodule: false,
            current_version: "1.0-SNAPSHOT".to_string(),
            release_version: "1.0".to_string(),
            level: 0,
            commands,
            relative_path: "lib/".to_string(),
        }
    }

    fn plan(config: Config) -> ReleasePlan {
        let lib = project(
            "com.example:lib",
            vec![Command::release_plugin(false, "1.1-SNAPSHOT", CommandState::Ready)],
        );
        let app = project(
            "com.other:app",
            vec![
                Command::update_dependency(
                    lib.id.clone(),
                    CommandState::waiting_for(lib.id.clone()),
                ),
                Command::release_plugin(
                    false,
                    "1.1-SNAPSHOT",
                    CommandState::waiting_for(lib.id.clone()),
                ),
            ],
        );
        let dependents = BTreeMap::from([
            (lib.id.clone(), BTreeSet::from([app.id.clone()])),
            (app.id.clone(), BTreeSet::new()),
        ]);
        ReleasePlan::from_parts(ReleasePlanParts {
            release_id: "rel-7".to_string(),
            state: ReleaseState::Ready,
            type_of_run: TypeOfRun::Release,
            root_project_id: lib.id.clone(),
            projects: BTreeMap::from([(lib.id.clone(), lib), (app.id.clone(), app)]),
            submodules: BTreeMap::new(),
            dependents,
            warnings: vec![],
            infos: vec![],
            config,
        })
        .expect("valid plan")
    }

    fn create(plan: &ReleasePlan, id: &str, index: usize) -> JobExecutionData {
        let factory = ConfiguredJobDataFactory::new("https://ci/", plan.config()).unwrap();
        let project = plan.project(&ProjectId::new(id)).unwrap();
        factory.create(plan, project, &project.commands[index]).unwrap()
    }

    #[test]
    fn test_missing_required_config() {
        let mut config = config(&[]);
        config.remove(&ConfigKey::CommitPrefix);
        let err = ConfiguredJobDataFactory::new("https://ci/", &config).unwrap_err();
        assert!(matches!(err, ReleaseError::MissingConfig(ConfigKey::CommitPrefix)));
    }

    #[test]
    fn test_update_dependency_job() {
        let plan = plan(config(&[]));
        let job = create(&plan, "com.other:app", 0);
        assert_eq!(job.job_base_url, "https://ci/job/update-dependency/");
        assert_eq!(job.parameter("pathToProject"), Some("lib/"));
        assert_eq!(job.parameter("dependency"), Some("com.example:lib"));
        assert_eq!(job.parameter("newVersion"), Some("1.0"));
        assert_eq!(job.parameter("commitPrefix"), Some("[DGR]"));
        assert_eq!(job.parameter("releaseId"), Some("rel-7"));
    }

    #[test]
    fn test_release_job_uses_defaults() {
        let plan = plan(config(&[]));
        let job = create(&plan, "com.example:lib", 0);
        assert_eq!(job.job_base_url, "https://ci/job/lib/");
        assert_eq!(job.parameter("releaseVersion"), Some("1.0"));
        assert_eq!(job.parameter("developmentVersion"), Some("1.1-SNAPSHOT"));
        assert_eq!(job.build_url(12), "https://ci/job/lib/12/");
    }

    #[test]
    fn test_release_job_uses_config() {
        let plan = plan(config(&[
            (ConfigKey::JobMapping, "com.other:app=app-release"),
            (ConfigKey::RegexParams, "com\\.other:.*#branch=main;skipTests=true"),
            (ConfigKey::BuildWithParamJobs, "com\\.other:app#VERSION;NEXT"),
        ]));
        let job = create(&plan, "com.other:app", 1);
        assert_eq!(job.job_base_url, "https://other-ci/job/app-release/");
        assert_eq!(job.parameter("VERSION"), Some("1.0"));
        assert_eq!(job.parameter("NEXT"), Some("1.1-SNAPSHOT"));
        assert_eq!(job.parameter("branch"), Some("main"));
        assert_eq!(job.parameter("skipTests"), Some("true"));
        assert_eq!(job.parameter("releaseVersion"), None);
    }

    #[test]
    fn test_invalid_config_entries() {
        let config = config(&[(ConfigKey::BuildWithParamJobs, "app#VERSION")]);
        assert!(ConfiguredJobDataFactory::new("https://ci/", &config).is_err());
        let config = self::config(&[(ConfigKey::JobMapping, "no-equals-sign")]);
        assert!(ConfiguredJobDataFactory::new("https://ci/", &config).is_err());
    }

    #[test]
    fn test_extract_build_number() {
        let plan = plan(config(&[]));
        let job = create(&plan, "com.example:lib", 0);
        let project = plan.project(&ProjectId::new("com.example:lib")).unwrap();
        let command = &project.commands[0];
        assert_eq!(
            extract_build_number("https://ci/job/lib/42/", &job, &project.id, 0, command).unwrap(),
            42
        );
        let err = extract_build_number("https://ci/queue/item/3/", &job, &project.id, 0, command)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("https://ci/queue/item/3/"), "{msg}");
        assert!(msg.contains("1. command"), "{msg}");
    }
}
