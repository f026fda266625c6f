//! Project options gathered from the caller and the environment.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::env::{ComposeEnv, ComposeSettings};
use super::find_compose_files;
use crate::document::Document;
use crate::dotenv;
use crate::interpolation::parse_bool;
use crate::loader::{ConfigDetails, FileSource, FsSource, LoadOptions, load_with_source};
use crate::paths::{absolute_dir, absolutize, current_dir, expand_user};
use crate::types::{Environment, Project};
use crate::{ComposeError, ComposeResult};

/// Name of the env file read from the working directory.
const DOTENV_FILE: &str = ".env";

/// Inputs for loading a project the way the command line does.
///
/// Build one with [`ProjectOptions::builder`].
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    name: Option<String>,
    working_dir: Option<Utf8PathBuf>,
    config_paths: Vec<Utf8PathBuf>,
    environment: Environment,
    profiles: Vec<String>,
    load_options: LoadOptions,
}

/// Builder for [`ProjectOptions`].
///
/// # Examples
///
/// ```
/// use compose_loader::MemorySource;
/// use compose_loader::discovery::ProjectOptions;
///
/// let source = MemorySource::default()
///     .with_file("/srv/shop/compose.yaml", "services:\n  web:\n    image: nginx\n");
/// let options = ProjectOptions::builder()
///     .working_dir("/srv/shop")
///     .environment([("COMPOSE_PROFILES".to_owned(), "debug".to_owned())].into())
///     .build_with_source(&source)
///     .unwrap();
/// assert_eq!(options.profiles(), ["debug"]);
///
/// let project = options.load_project_with_source(&source).unwrap();
/// assert_eq!(project.name, "shop");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectOptionsBuilder {
    name: Option<String>,
    working_dir: Option<Utf8PathBuf>,
    config_paths: Vec<Utf8PathBuf>,
    env_file: Option<Utf8PathBuf>,
    dotenv: bool,
    environment: Option<Environment>,
    load_options: LoadOptions,
}

impl ProjectOptionsBuilder {
    /// A builder with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `name` as the project name, overriding every other source.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolve relative paths against `dir` instead of the directory of the
    /// first compose file.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Load `path` instead of discovering compose files. Repeat to layer
    /// several files.
    #[must_use]
    pub fn config_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.config_paths.push(path.into());
        self
    }

    /// Read variables from `path`. The file must exist.
    #[must_use]
    pub fn env_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Read `.env` from the working directory when it exists.
    #[must_use]
    pub const fn dotenv(mut self, enabled: bool) -> Self {
        self.dotenv = enabled;
        self
    }

    /// Use `environment` for interpolation and `COMPOSE_*` settings instead
    /// of the process environment.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Options handed to [`load`](crate::load).
    #[must_use]
    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    /// Gather settings, reading env files from the local filesystem.
    ///
    /// # Errors
    ///
    /// See [`ProjectOptionsBuilder::build_with_source`].
    pub fn build(self) -> ComposeResult<ProjectOptions> {
        self.build_with_source(&FsSource)
    }

    /// Gather settings, reading env files from `source`.
    ///
    /// # Errors
    ///
    /// Fails when an explicit env file cannot be read, an env file does not
    /// parse, the current directory is needed but unknown, or a `COMPOSE_*`
    /// value is invalid.
    pub fn build_with_source(self, source: &dyn FileSource) -> ComposeResult<ProjectOptions> {
        let from_process = self.environment.is_none();
        let mut environment = self.environment.unwrap_or_else(process_environment);
        let working_dir = self.working_dir.map(|dir| absolute_dir(&dir)).transpose()?;

        let base_dir = || working_dir.clone().map_or_else(current_dir, Ok);
        let dotenv_path = match (&self.env_file, self.dotenv) {
            (Some(file), _) => Some(Utf8PathBuf::from(absolutize(
                &base_dir()?,
                &expand_user(file.as_str()),
            ))),
            (None, true) => Some(base_dir()?.join(DOTENV_FILE)).filter(|path| source.exists(path)),
            (None, false) => None,
        };
        let read_dotenv = dotenv_path.is_some();
        if let Some(path) = dotenv_path {
            fill_from_env_file(&mut environment, &path, source)?;
        }

        let provider = if from_process && !read_dotenv {
            ComposeEnv::from_process()
        } else {
            ComposeEnv::from_environment(&environment)
        };
        let settings = ComposeSettings::gather(provider)?;
        let mut load_options = self.load_options;
        if let Some(raw) = settings.convert_windows_paths.as_deref()
            && !raw.is_empty()
        {
            let convert = parse_bool(raw).ok_or_else(|| {
                ComposeError::decode("COMPOSE_CONVERT_WINDOWS_PATHS", format!("invalid boolean: {raw}"))
            })?;
            load_options = load_options.convert_windows_paths(convert);
        }

        let config_paths = if self.config_paths.is_empty() {
            settings.files().into_iter().map(Utf8PathBuf::from).collect()
        } else {
            self.config_paths
        };
        let name = self
            .name
            .or_else(|| settings.project_name.clone().filter(|name| !name.is_empty()));

        Ok(ProjectOptions {
            name,
            working_dir,
            config_paths,
            environment,
            profiles: settings.profiles(),
            load_options,
        })
    }
}

impl ProjectOptions {
    /// Start building options.
    #[must_use]
    pub fn builder() -> ProjectOptionsBuilder {
        ProjectOptionsBuilder::new()
    }

    /// Explicitly chosen compose files, before discovery.
    #[must_use]
    pub fn config_paths(&self) -> &[Utf8PathBuf] {
        &self.config_paths
    }

    /// Environment used for interpolation.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Enabled profiles.
    #[must_use]
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Explicit or `COMPOSE_PROJECT_NAME` project name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Load the project from the local filesystem.
    ///
    /// # Errors
    ///
    /// See [`ProjectOptions::load_project_with_source`].
    pub fn load_project(&self) -> ComposeResult<Project> {
        self.load_project_with_source(&FsSource)
    }

    /// Locate and read the compose files through `source`, then load them.
    ///
    /// Without explicit files, discovery starts at the working directory
    /// (or the current directory). Without an explicit working directory,
    /// paths resolve against the directory of the first compose file. The
    /// project name falls back to that directory's base name, which a
    /// `name:` in the documents may override.
    ///
    /// # Errors
    ///
    /// Fails when no compose file is found, a file cannot be read, or any
    /// load stage fails.
    pub fn load_project_with_source(&self, source: &dyn FileSource) -> ComposeResult<Project> {
        let start = self.working_dir.clone().map_or_else(current_dir, Ok)?;
        let files = if self.config_paths.is_empty() {
            find_compose_files(&start, source)?
        } else {
            self.config_paths
                .iter()
                .map(|path| Utf8PathBuf::from(absolutize(&start, &expand_user(path.as_str()))))
                .collect()
        };
        let working_dir = match (&self.working_dir, files.first()) {
            (Some(dir), _) => dir.clone(),
            (None, Some(first)) => first.parent().map_or_else(|| start.clone(), Utf8Path::to_path_buf),
            (None, None) => start,
        };

        let documents = files
            .iter()
            .map(|path| Ok(Document::from_bytes(path.as_str(), source.read(path)?)))
            .collect::<ComposeResult<Vec<_>>>()?;

        let mut options = self.load_options.clone();
        let (name, imperative) = self
            .name
            .as_deref()
            .map_or_else(|| (working_dir.file_name().unwrap_or_default(), false), |name| (name, true));
        options.set_project_name(name, imperative);
        debug!(files = ?files, working_dir = %working_dir, "loading project");

        let details = ConfigDetails::new(working_dir, documents, self.environment.clone());
        let mut project = load_with_source(details, &options, source)?;
        project.apply_profiles(&self.profiles);
        Ok(project)
    }
}

fn process_environment() -> Environment {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Add the variables of the env file at `path` that are not already set.
fn fill_from_env_file(environment: &mut Environment, path: &Utf8Path, source: &dyn FileSource) -> ComposeResult<()> {
    let bytes = source.read(path)?;
    let content = String::from_utf8(bytes).map_err(|_| ComposeError::decode(path.as_str(), "env file is not valid UTF-8"))?;
    let values = {
        let lookup = |key: &str| environment.get(key).cloned();
        dotenv::parse(&content, &lookup).map_err(|err| ComposeError::decode(path.as_str(), err.to_string()))?
    };
    for (key, value) in values.into_iter().filter_map(|(key, value)| value.map(|v| (key, v))) {
        environment.entry(key).or_insert(value);
    }
    debug!(file = %path, "read project env file");
    Ok(())
}
