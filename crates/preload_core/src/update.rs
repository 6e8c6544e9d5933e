use std::path::PathBuf;

use preload_logging::{preload_debug, preload_info, preload_warn};

use crate::{
    AcquisitionStage, Effect, FailureReason, MonitorEvent, Msg, NodeStatusEvent, PipelineEvent,
    PreloadProgressEvent, PreloadSession, PreloadState, SessionOutcome, SnapshotMetadata,
    SyncCounters, SyncPhase, TrackEvent, ValidationError, ValidationResult,
};

/// Pure update function: applies a message to the session and returns any effects.
pub fn update(mut session: PreloadSession, msg: Msg) -> (PreloadSession, Vec<Effect>) {
    if session.state().is_terminal() {
        if msg != Msg::NoOp {
            preload_debug!("session is terminal, ignoring {}", msg_name(&msg));
        }
        return (session, Vec::new());
    }

    let mut effects = Vec::new();
    match msg {
        Msg::Start => start(&mut session, &mut effects),
        Msg::MetadataDownloaded { metadata } => {
            metadata_downloaded(&mut session, metadata, &mut effects)
        }
        Msg::ValidationFinished(result) => validation_finished(&mut session, result, &mut effects),
        Msg::DownloadProgress { fraction } => download_progress(&mut session, fraction),
        Msg::DownloadComplete { path } => download_complete(&mut session, path, &mut effects),
        Msg::ExtractProgress { fraction } => extract_progress(&mut session, fraction),
        Msg::ExtractComplete => extract_complete(&mut session, &mut effects),
        Msg::AcquisitionFailed { stage, cause } => {
            acquisition_failed(&mut session, stage, cause, &mut effects)
        }
        Msg::NodeStatus(event) => node_status(&mut session, &event, &mut effects),
        Msg::PreloadProgress(event) => preload_progress(&mut session, &event),
        Msg::NodeStartFailed { cause } => node_start_failed(&mut session, cause, &mut effects),
        Msg::Cancel => cancel(&mut session, &mut effects),
        Msg::NoOp => {}
    }

    if let Some(step) = session.unannounced_step() {
        effects.push(Effect::Track(TrackEvent::StepEntered(step)));
    }

    (session, effects)
}

fn start(session: &mut PreloadSession, effects: &mut Vec<Effect>) {
    if *session.state() != PreloadState::Idle {
        preload_debug!("start ignored outside Idle");
        return;
    }
    if session.config().use_snapshot {
        preload_info!("snapshot enabled, fetching metadata");
        session.set_state(PreloadState::ValidatingSnapshot);
        effects.push(Effect::DownloadMetadata);
    } else {
        preload_info!("snapshot disabled, starting node directly");
        enter_sync(session, effects);
    }
}

fn metadata_downloaded(
    session: &mut PreloadSession,
    metadata: SnapshotMetadata,
    effects: &mut Vec<Effect>,
) {
    if *session.state() != PreloadState::ValidatingSnapshot || session.has_pending_metadata() {
        preload_debug!("unexpected snapshot metadata ignored");
        return;
    }
    preload_info!("metadata downloaded ({} bytes), validating", metadata.len());
    session.set_pending_metadata(metadata.clone());
    effects.push(Effect::ValidateSnapshot { metadata });
}

fn validation_finished(
    session: &mut PreloadSession,
    result: Result<ValidationResult, ValidationError>,
    effects: &mut Vec<Effect>,
) {
    if *session.state() != PreloadState::ValidatingSnapshot {
        preload_debug!("validation result ignored outside ValidatingSnapshot");
        return;
    }
    let Some(metadata) = session.take_pending_metadata() else {
        preload_warn!("validation result without pending metadata ignored");
        return;
    };

    match result {
        Ok(ValidationResult { usable: true }) => {
            preload_info!("snapshot is valid, start downloading");
            if session.pipeline_mut().begin_download() {
                session.set_state(PreloadState::DownloadingSnapshot { fraction: 0.0 });
                effects.push(Effect::RequestDownload { metadata });
            }
        }
        Ok(ValidationResult { usable: false }) => {
            preload_info!(
                "snapshot is invalid or redundant ({} bytes), skipping snapshot",
                metadata.len()
            );
            skip_snapshot(session, effects);
        }
        Err(err) => {
            preload_warn!("{err}; skipping snapshot");
            skip_snapshot(session, effects);
        }
    }
}

fn download_progress(session: &mut PreloadSession, fraction: f64) {
    if !matches!(session.state(), PreloadState::DownloadingSnapshot { .. }) {
        preload_debug!("download progress ignored outside DownloadingSnapshot");
        return;
    }
    match session.pipeline_mut().download_progress(fraction) {
        Ok(Some(PipelineEvent::Progress { fraction, .. })) => {
            session.set_state(PreloadState::DownloadingSnapshot { fraction });
        }
        Ok(_) => {}
        Err(err) => preload_warn!("malformed download progress: {err}"),
    }
}

fn download_complete(session: &mut PreloadSession, path: PathBuf, effects: &mut Vec<Effect>) {
    if !matches!(session.state(), PreloadState::DownloadingSnapshot { .. }) {
        preload_debug!("download completion ignored outside DownloadingSnapshot");
        return;
    }
    if let Some(PipelineEvent::ExtractRequested { path }) =
        session.pipeline_mut().download_complete(path)
    {
        preload_info!("snapshot downloaded to {}, extracting", path.display());
        session.set_state(PreloadState::ExtractingSnapshot { fraction: 0.0 });
        effects.push(Effect::RequestExtract { path });
    }
}

fn extract_progress(session: &mut PreloadSession, fraction: f64) {
    if !matches!(session.state(), PreloadState::ExtractingSnapshot { .. }) {
        preload_debug!("extract progress ignored outside ExtractingSnapshot");
        return;
    }
    match session.pipeline_mut().extract_progress(fraction) {
        Ok(Some(PipelineEvent::Progress { fraction, .. })) => {
            session.set_state(PreloadState::ExtractingSnapshot { fraction });
        }
        Ok(_) => {}
        Err(err) => preload_warn!("malformed extract progress: {err}"),
    }
}

fn extract_complete(session: &mut PreloadSession, effects: &mut Vec<Effect>) {
    if !matches!(session.state(), PreloadState::ExtractingSnapshot { .. }) {
        preload_debug!("extract completion ignored outside ExtractingSnapshot");
        return;
    }
    if let Some(PipelineEvent::SnapshotReady) = session.pipeline_mut().extract_complete() {
        preload_info!("snapshot extraction completed, start IBD");
        enter_sync(session, effects);
    }
}

fn acquisition_failed(
    session: &mut PreloadSession,
    stage: AcquisitionStage,
    cause: String,
    effects: &mut Vec<Effect>,
) {
    match session.state() {
        PreloadState::ValidatingSnapshot => {
            session.take_pending_metadata();
        }
        PreloadState::DownloadingSnapshot { .. } | PreloadState::ExtractingSnapshot { .. } => {
            if session.pipeline_mut().fail(stage, cause.clone()).is_none() {
                return;
            }
        }
        _ => {
            preload_debug!("acquisition failure ({stage}) ignored, no acquisition running");
            return;
        }
    }
    preload_warn!("snapshot {stage} failed: {cause}; falling back to sync without snapshot");
    effects.push(Effect::Track(TrackEvent::AcquisitionFailed { stage, cause }));
    enter_sync(session, effects);
}

fn node_status(session: &mut PreloadSession, event: &NodeStatusEvent, effects: &mut Vec<Effect>) {
    if !matches!(session.state(), PreloadState::RunningSync { .. }) {
        preload_debug!("node status before node start ignored");
        return;
    }
    if let Some(MonitorEvent::PreloadEnded { phase }) = session.monitor_mut().observe_status(event)
    {
        finish_sync(session, phase, effects);
    }
}

fn preload_progress(session: &mut PreloadSession, event: &PreloadProgressEvent) {
    let PreloadState::RunningSync { phase: previous, .. } = *session.state() else {
        preload_debug!("preload progress before node start ignored");
        return;
    };
    match session.monitor_mut().observe_progress(event) {
        Ok(Some(MonitorEvent::Progress { phase, counters })) => {
            if phase < previous {
                preload_debug!("node revisited {phase} after {previous}");
            }
            session.set_state(PreloadState::RunningSync { phase, counters });
        }
        Ok(_) => {}
        Err(err) => preload_warn!("malformed preload progress: {err}"),
    }
}

fn node_start_failed(session: &mut PreloadSession, cause: String, effects: &mut Vec<Effect>) {
    if !session.node_started() {
        preload_debug!("node failure reported before node start ignored");
        return;
    }
    let reason = FailureReason::NodeStartFailed { cause };
    preload_warn!("{reason}");
    finish(
        session,
        PreloadState::Failed(reason.clone()),
        SessionOutcome::Failed(reason),
        effects,
    );
}

fn cancel(session: &mut PreloadSession, effects: &mut Vec<Effect>) {
    if session.pipeline().is_in_flight() {
        effects.push(Effect::AbortAcquisition);
    }
    preload_info!("preload session cancelled");
    finish(
        session,
        PreloadState::Cancelled,
        SessionOutcome::Cancelled,
        effects,
    );
}

/// `preloadEnded` arrived. Ending outside a settled phase is only trusted without peers.
fn finish_sync(session: &mut PreloadSession, phase: SyncPhase, effects: &mut Vec<Effect>) {
    if !phase.is_settled() && session.config().peer_list_non_empty {
        let reason = FailureReason::InconsistentTerminalPhase { phase };
        preload_warn!("{reason}");
        finish(
            session,
            PreloadState::Failed(reason.clone()),
            SessionOutcome::Failed(reason),
            effects,
        );
        return;
    }
    preload_info!("preload completed in {phase}");
    finish(
        session,
        PreloadState::SyncComplete,
        SessionOutcome::Ready,
        effects,
    );
}

fn skip_snapshot(session: &mut PreloadSession, effects: &mut Vec<Effect>) {
    effects.push(Effect::Track(TrackEvent::SnapshotSkipped));
    enter_sync(session, effects);
}

fn enter_sync(session: &mut PreloadSession, effects: &mut Vec<Effect>) {
    session.reset_monitor();
    session.set_state(PreloadState::RunningSync {
        phase: SyncPhase::default(),
        counters: SyncCounters::default(),
    });
    if session.mark_node_started() {
        effects.push(Effect::StartNode);
        effects.push(Effect::Track(TrackEvent::IbdStarted));
    }
}

fn finish(
    session: &mut PreloadSession,
    state: PreloadState,
    outcome: SessionOutcome,
    effects: &mut Vec<Effect>,
) {
    session.set_state(state);
    effects.push(Effect::Finished(outcome));
}

fn msg_name(msg: &Msg) -> &'static str {
    match msg {
        Msg::Start => "Start",
        Msg::MetadataDownloaded { .. } => "MetadataDownloaded",
        Msg::ValidationFinished(_) => "ValidationFinished",
        Msg::DownloadProgress { .. } => "DownloadProgress",
        Msg::DownloadComplete { .. } => "DownloadComplete",
        Msg::ExtractProgress { .. } => "ExtractProgress",
        Msg::ExtractComplete => "ExtractComplete",
        Msg::AcquisitionFailed { .. } => "AcquisitionFailed",
        Msg::NodeStatus(_) => "NodeStatus",
        Msg::PreloadProgress(_) => "PreloadProgress",
        Msg::NodeStartFailed { .. } => "NodeStartFailed",
        Msg::Cancel => "Cancel",
        Msg::NoOp => "NoOp",
    }
}
