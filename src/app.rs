use std::any::Any;
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{InstallRequest, WorkshopId, item_dir, vehicle_path};
use crate::error::InstallError;
use crate::msg::{LogEntry, WorkerMsg};
use crate::source::XmlSource;
use crate::vehicle;

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub workshop_id: WorkshopId,
    pub written_path: Utf8PathBuf,
    pub bytes: usize,
}

pub trait ReportSink {
    fn report(&self, entry: LogEntry);
}

impl ReportSink for Sender<WorkerMsg> {
    fn report(&self, entry: LogEntry) {
        // The window may already be gone; nothing left to show it to.
        let _ = self.send(WorkerMsg::Log(entry));
    }
}

pub struct Installer<S: XmlSource> {
    source: S,
}

impl<S: XmlSource> Installer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches, validates and writes one vehicle file.
    ///
    /// Progress goes to `sink` as info lines; the returned error is the single failure
    /// that stopped the run and is left for the caller to report.
    pub fn install(
        &self,
        request: &InstallRequest,
        sink: &dyn ReportSink,
    ) -> Result<InstallOutcome, InstallError> {
        if !request.has_all_inputs() {
            return Err(InstallError::MissingInputs);
        }

        let workshop_dir = &request.workshop_dir;
        if !workshop_dir.as_std_path().is_dir() {
            return Err(InstallError::InvalidBasePath(workshop_dir.clone()));
        }

        let workshop_id = WorkshopId::extract(&request.item_input)
            .ok_or_else(|| InstallError::InvalidItemId(request.item_input.clone()))?;
        note(sink, format!("Using Workshop ID: {workshop_id}"));

        let item_folder = item_dir(workshop_dir, &workshop_id);
        tracing::debug!(target_dir = %item_folder, "resolved item folder");
        if !item_folder.as_std_path().is_dir() {
            return Err(InstallError::ItemFolderNotFound(item_folder));
        }
        note(sink, format!("Found workshop item folder: {item_folder}"));

        note(
            sink,
            format!("Fetching vehicle XML from: {}", request.source_url),
        );
        let text = self.source.fetch_text(&request.source_url)?;
        tracing::info!(bytes = text.len(), "vehicle XML fetched");
        note(sink, "Vehicle XML fetched successfully.");

        note(sink, "Validating XML structure...");
        vehicle::validate(&text)?;
        note(sink, "XML structure appears valid.");

        let target = vehicle_path(workshop_dir, &workshop_id);
        write_vehicle(&target, &text)?;
        note(sink, format!("Successfully updated: {target}"));

        note(
            sink,
            "Vehicle XML installed. The existing preview image of the dummy item will be used.",
        );
        note(sink, "--- Installation Complete! ---");

        Ok(InstallOutcome {
            workshop_id,
            written_path: target,
            bytes: text.len(),
        })
    }
}

/// Runs one install on a dedicated thread.
///
/// Every outcome, including a panic inside the pipeline, ends with exactly one
/// [`WorkerMsg::TriggerReleased`].
pub fn spawn_install<S>(
    installer: Arc<Installer<S>>,
    request: InstallRequest,
    tx: Sender<WorkerMsg>,
) -> thread::JoinHandle<()>
where
    S: XmlSource + 'static,
{
    thread::spawn(move || {
        let _release = TriggerRelease { tx: tx.clone() };
        run_install(&installer, &request, &tx);
    })
}

/// Worker body: runs the pipeline and turns any failure into one error line.
pub fn run_install<S: XmlSource>(
    installer: &Installer<S>,
    request: &InstallRequest,
    sink: &dyn ReportSink,
) -> Option<InstallOutcome> {
    tracing::info!("worker: starting vehicle installation");
    let result = panic::catch_unwind(AssertUnwindSafe(|| installer.install(request, sink)))
        .unwrap_or_else(|payload| Err(InstallError::Unexpected(panic_message(payload.as_ref()))));

    match result {
        Ok(outcome) => {
            tracing::info!(path = %outcome.written_path, "worker: installation complete");
            Some(outcome)
        }
        Err(err) => {
            tracing::error!(error = ?err, "worker: installation failed");
            sink.report(LogEntry::error(format!("Error: {err}")));
            None
        }
    }
}

struct TriggerRelease {
    tx: Sender<WorkerMsg>,
}

impl Drop for TriggerRelease {
    fn drop(&mut self) {
        tracing::debug!("worker: releasing trigger");
        let _ = self.tx.send(WorkerMsg::TriggerReleased);
    }
}

fn note(sink: &dyn ReportSink, message: impl Into<String>) {
    let entry = LogEntry::info(message);
    tracing::info!("{}", entry.message);
    sink.report(entry);
}

/// Replaces `path` with `content` via a temp file in the same directory.
fn write_vehicle(path: &Utf8Path, content: &str) -> Result<(), InstallError> {
    let write_err = |message: String| InstallError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };
    let parent = path
        .parent()
        .ok_or_else(|| write_err("invalid destination path".to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".vehicle-xml")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| write_err(err.to_string()))?;
    temp.write_all(content.as_bytes())
        .map_err(|err| write_err(err.to_string()))?;
    // Keep the mode of the file being replaced; temp files start out owner-only.
    if let Ok(existing) = fs::metadata(path.as_std_path()) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|err| write_err(err.to_string()))?;
    }
    temp.persist(path.as_std_path())
        .map_err(|err| write_err(err.error.to_string()))?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
