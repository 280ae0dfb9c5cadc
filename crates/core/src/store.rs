//! File-backed project store.
//!
//! Layout under the root directory:
//! `projects/<id>.json`, `audio/<imported mp3>`, `Recordings/<project>/<sentence>.<ext>`.

use crate::error::StoreError;
use crate::project::{Project, Sentence, SentenceStatus};
use crate::segment::merge_cues;
use crate::srt;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};
use uuid::Uuid;

const PROJECTS_DIR: &str = "projects";
const AUDIO_DIR: &str = "audio";
const RECORDINGS_DIR: &str = "Recordings";

/// Default extension for sentence recordings.
pub const RECORDING_EXT: &str = "m4a";

pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// Open a store rooted at `root`, creating its directories when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        trace!("ProjectStore::open(root={})", root.display());
        for dir in [PROJECTS_DIR, AUDIO_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
        }
        Ok(Self { root })
    }

    /// Directory the store was opened on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_path(&self, id: Uuid) -> PathBuf {
        self.root.join(PROJECTS_DIR).join(format!("{id}.json"))
    }

    /// Write `project` to its JSON file, replacing any earlier version.
    pub fn save(&self, project: &Project) -> Result<()> {
        let path = self.project_path(project.id);
        trace!("save path={}", path.display());
        let text = serde_json::to_string_pretty(project)?;
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        debug!("saved project {} to {}", project.id, path.display());
        Ok(())
    }

    /// Read a project back; a missing file is [`StoreError::ProjectNotFound`].
    pub fn load(&self, id: Uuid) -> Result<Project> {
        let path = self.project_path(id);
        trace!("load path={}", path.display());
        if !path.exists() {
            return Err(StoreError::ProjectNotFound(id).into());
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let project = serde_json::from_str(&text)
            .with_context(|| format!("decoding {}", path.display()))?;
        Ok(project)
    }

    /// All stored projects, oldest first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(self.root.join(PROJECTS_DIR))? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let project: Project = serde_json::from_str(&text)
                    .with_context(|| format!("decoding {}", path.display()))?;
                projects.push(project);
            }
        }
        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }

    /// Delete a project together with its recordings.
    /// The imported audio goes too unless another project still refers to it.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let project = self.load(id)?;
        let recordings = self.root.join(RECORDINGS_DIR).join(id.to_string());
        if recordings.exists() {
            fs::remove_dir_all(&recordings)?;
        }
        fs::remove_file(self.project_path(id))?;
        if let Some(name) = &project.source_audio_file_name {
            let shared = self
                .list()?
                .iter()
                .any(|other| other.source_audio_file_name.as_ref() == Some(name));
            let audio = self.root.join(AUDIO_DIR).join(name);
            if shared {
                debug!("keeping {} still used by another project", name);
            } else if audio.exists() {
                fs::remove_file(&audio)?;
            }
        }
        info!("deleted project {} ({})", project.title, id);
        Ok(())
    }

    /// Copy a user-chosen mp3 into managed storage and return its stored name.
    /// An existing file is never overwritten; a counter is appended instead.
    pub fn import_audio(&self, src: &Path) -> Result<String> {
        trace!("import_audio(src={})", src.display());
        let ext = src
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if ext != "mp3" {
            return Err(StoreError::NotMp3(src.to_path_buf()).into());
        }
        let stem = src.file_stem().unwrap_or_default().to_string_lossy();
        let mut name = unique_file_name(&stem, &ext);
        let mut dest = self.root.join(AUDIO_DIR).join(&name);
        let mut counter = 1;
        while dest.exists() {
            counter += 1;
            name = unique_file_name(&format!("{stem}_{counter}"), &ext);
            dest = self.root.join(AUDIO_DIR).join(&name);
        }
        fs::copy(src, &dest)
            .with_context(|| format!("copying {} to {}", src.display(), dest.display()))?;
        info!("imported audio {}", name);
        Ok(name)
    }

    /// Absolute path of the project's imported audio, if it has one.
    pub fn source_audio_path(&self, project: &Project) -> Option<PathBuf> {
        project
            .source_audio_file_name
            .as_ref()
            .map(|name| self.root.join(AUDIO_DIR).join(name))
    }

    /// Absolute path for a sentence recording; the project directory is created.
    pub fn recording_path(
        &self,
        project_id: Uuid,
        sentence_id: Uuid,
        ext: &str,
    ) -> Result<PathBuf> {
        let path = self
            .root
            .join(recording_relative_path(project_id, sentence_id, ext));
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(path)
    }

    /// Parse and merge `srt_path`, import `audio_path` and save the result.
    /// A blank title falls back to the audio file stem.
    pub fn create_audio_project(
        &self,
        title: &str,
        audio_path: &Path,
        srt_path: &Path,
    ) -> Result<Project> {
        let cues = srt::parse_file(srt_path)?;
        let segments = merge_cues(&cues);
        debug!("{} cues merged into {} segments", cues.len(), segments.len());
        if segments.is_empty() {
            return Err(StoreError::MissingSegments.into());
        }
        let title = if title.trim().is_empty() {
            audio_path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string()
        } else {
            title.to_string()
        };
        let audio_name = self.import_audio(audio_path)?;
        let project = Project::from_segments(&title, &audio_name, &segments);
        self.save(&project)?;
        info!(
            "created project {} with {} sentences",
            project.title,
            project.total_count()
        );
        Ok(project)
    }

    /// Split `body` into sentences and save an untimed project.
    pub fn create_text_project(&self, title: &str, body: &str) -> Result<Project> {
        if title.trim().is_empty() {
            bail!("project title is empty");
        }
        if body.trim().is_empty() {
            bail!("project text is empty");
        }
        let project = Project::from_text(title, body);
        self.save(&project)?;
        info!(
            "created project {} with {} sentences",
            project.title,
            project.total_count()
        );
        Ok(project)
    }

    /// Copy a take into the sentence's recording slot and mark it recorded.
    /// A previous take with a different name is removed.
    pub fn attach_recording(
        &self,
        project_id: Uuid,
        order: usize,
        take: &Path,
    ) -> Result<Project> {
        trace!(
            "attach_recording(project={project_id}, order={order}, take={})",
            take.display()
        );
        let mut project = self.load(project_id)?;
        let sentence = sentence_at(&mut project, order)?;
        let ext = take
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| RECORDING_EXT.to_string());
        let dest = self.recording_path(project_id, sentence.id, &ext)?;
        fs::copy(take, &dest)
            .with_context(|| format!("copying {} to {}", take.display(), dest.display()))?;
        let relative = recording_relative_path(project_id, sentence.id, &ext);
        if let Some(old) = sentence.attach_recording(relative.clone()) {
            if old != relative {
                self.remove_take(&old)?;
            }
        }
        self.save(&project)?;
        Ok(project)
    }

    /// Move a sentence to `status`. Returning to `NotStarted` deletes its take;
    /// `Recorded` is only reachable through [`ProjectStore::attach_recording`].
    pub fn mark_sentence(
        &self,
        project_id: Uuid,
        order: usize,
        status: SentenceStatus,
    ) -> Result<Project> {
        trace!("mark_sentence(project={project_id}, order={order}, status={status})");
        let mut project = self.load(project_id)?;
        let sentence = sentence_at(&mut project, order)?;
        match status {
            SentenceStatus::NotStarted => {
                if let Some(old) = sentence.reset() {
                    self.remove_take(&old)?;
                }
            }
            SentenceStatus::Recorded => bail!("attach a recording to mark a sentence recorded"),
            SentenceStatus::NeedsReview => sentence.mark_needs_review(),
            SentenceStatus::Approved => sentence.approve(),
        }
        self.save(&project)?;
        Ok(project)
    }

    fn remove_take(&self, relative: &str) -> Result<()> {
        let path = self.root.join(relative);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

fn sentence_at(project: &mut Project, order: usize) -> Result<&mut Sentence> {
    let project_id = project.id;
    project
        .sentence_mut(order)
        .ok_or_else(|| StoreError::SentenceNotFound { project: project_id, order }.into())
}

/// `Recordings/<project>/<sentence>.<ext>`, relative to the store root.
pub fn recording_relative_path(project_id: Uuid, sentence_id: Uuid, ext: &str) -> String {
    format!("{RECORDINGS_DIR}/{project_id}/{sentence_id}.{ext}")
}

/// File name for imported audio, stamped with the current unix time.
pub fn unique_file_name(base: &str, ext: &str) -> String {
    stamped_file_name(base, ext, Utc::now().timestamp())
}

fn stamped_file_name(base: &str, ext: &str, stamp: i64) -> String {
    let safe: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{safe}_{stamp}.{ext}")
}
