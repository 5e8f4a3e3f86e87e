use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error};

use super::AssembleError;
use crate::branding::BrandingSet;
use crate::config::BuildConfiguration;
use crate::locales::FsLocaleSource;
use crate::webapp::{AppSource, Webapp, package, write_webapp};

/// A webapp written into the profile, with its archive contents released.
#[derive(Debug)]
pub struct PackagedApp {
  pub webapp: Webapp,
  pub archive_size: Option<u64>,
}

/// Shared, read-only inputs of every packaging task.
#[derive(Debug, Clone)]
pub struct PackagingInputs {
  pub config: Arc<BuildConfiguration>,
  pub branding: Arc<BrandingSet>,
  pub locales: Arc<Vec<String>>,
  pub locale_source: Arc<FsLocaleSource>,
}

/// When packaging must give up, and the limit it was given.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  pub at: Instant,
  pub limit: Duration,
}

impl Deadline {
  pub fn after(limit: Duration) -> Self {
    Self {
      at: Instant::now() + limit,
      limit,
    }
  }
}

/// Package and write every app into `webapps_dir`, at most `jobs` at a time.
///
/// On the first failure, or when `deadline` passes, queued apps are cancelled
/// and apps already being packaged stop before writing. Every task has
/// finished by the time this returns, so nothing writes into `webapps_dir`
/// afterwards. Results are sorted by app id.
pub async fn package_all(
  apps: Vec<AppSource>,
  inputs: PackagingInputs,
  webapps_dir: &Path,
  jobs: usize,
  deadline: Option<Deadline>,
) -> Result<Vec<PackagedApp>, AssembleError> {
  let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
  let cancelled = Arc::new(AtomicBool::new(false));
  let mut join_set = JoinSet::new();

  for app in apps {
    let inputs = inputs.clone();
    let semaphore = semaphore.clone();
    let cancelled = cancelled.clone();
    let webapps_dir = webapps_dir.to_path_buf();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await.map_err(|_| AssembleError::Cancelled)?;

      let name = app.name.clone();
      tokio::task::spawn_blocking(move || package_one(&app, &inputs, &webapps_dir, &cancelled))
        .await
        .map_err(|e| AssembleError::TaskFailed(format!("packaging {name}: {e}")))?
    });
  }

  let expired = async {
    match deadline {
      Some(deadline) => tokio::time::sleep_until(deadline.at).await,
      None => std::future::pending().await,
    }
  };
  tokio::pin!(expired);

  let mut packaged = Vec::new();
  let mut failure: Option<AssembleError> = None;
  let cancel = |failure: &mut Option<AssembleError>, e: AssembleError| {
    error!(error = %e, "packaging failed, cancelling remaining apps");
    cancelled.store(true, Ordering::Release);
    semaphore.close();
    *failure = Some(e);
  };

  while !join_set.is_empty() {
    let joined = tokio::select! {
      biased;
      _ = &mut expired, if failure.is_none() => {
        let limit = deadline.map(|d| d.limit).unwrap_or_default();
        cancel(&mut failure, AssembleError::TimedOut(limit));
        continue;
      }
      joined = join_set.join_next() => joined,
    };
    let Some(joined) = joined else {
      break;
    };

    let result = joined
      .map_err(|e| AssembleError::TaskFailed(e.to_string()))
      .and_then(|result| result);
    match result {
      Ok(app) => packaged.push(app),
      Err(e) if failure.is_some() => debug!(error = %e, "packaging task stopped"),
      Err(e) => cancel(&mut failure, e),
    }
  }

  if let Some(e) = failure {
    return Err(e);
  }
  packaged.sort_by(|a, b| a.webapp.id.cmp(&b.webapp.id));
  Ok(packaged)
}

fn package_one(
  app: &AppSource,
  inputs: &PackagingInputs,
  webapps_dir: &Path,
  cancelled: &AtomicBool,
) -> Result<PackagedApp, AssembleError> {
  if cancelled.load(Ordering::Acquire) {
    return Err(AssembleError::Cancelled);
  }
  let mut webapp = package(
    app,
    &inputs.branding,
    &inputs.locales,
    inputs.locale_source.as_ref(),
    &inputs.config,
  )?;

  if cancelled.load(Ordering::Acquire) {
    return Err(AssembleError::Cancelled);
  }
  let archive_size = write_webapp(&webapp, webapps_dir)?;
  debug!(app = %webapp.id, archive_size = ?archive_size, "wrote webapp");
  webapp.files.clear();
  Ok(PackagedApp { webapp, archive_size })
}
