// THEORY:
// The `batch` module runs the same substitute through many templates at once. The
// placement core is strictly sequential, so parallelism lives entirely above it:
// every template gets its own `SubstitutionEngine`, nothing is shared between jobs
// except the read-only substitute image.
//
// Key architectural principles:
// 1.  **One engine per job**: the "current attempt" state never crosses a job
//     boundary, so no locking is needed anywhere below this module.
// 2.  **Bounded workers**: CPU-heavy searches run on tokio's blocking pool, gated by
//     a semaphore sized to the machine's cores (or an explicit worker count).
// 3.  **Ordered results**: outcomes are collected with `join_all` and come back in the
//     same order the jobs were submitted, whatever order they finished in.

use crate::config::RememeConfig;
use crate::engine::{SubstitutionEngine, SubstitutionParams};
use crate::error::{Result, SubstitutionError};
use crate::image_io;
use crate::retry_search::{SearchReport, SearchSpace, search};
use futures::future::join_all;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// One template to process.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub template_path: PathBuf,
    /// Where to write the composed PNG when a placement is accepted.
    pub output_path: Option<PathBuf>,
}

impl BatchJob {
    /// A job writing `<output_dir>/<template stem>_rememe.png`.
    pub fn into_dir(template_path: PathBuf, output_dir: &Path) -> Self {
        let stem = template_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());
        Self {
            output_path: Some(output_dir.join(format!("{stem}_rememe.png"))),
            template_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Placed {
        params: SubstitutionParams,
        attempts: usize,
        output_path: Option<PathBuf>,
    },
    NotFound {
        attempts: usize,
    },
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub template_path: PathBuf,
    pub result: Result<JobStatus>,
}

/// Runs a retry search per template on a bounded pool of blocking workers.
pub struct BatchRunner {
    config: RememeConfig,
    substitute: Arc<DynamicImage>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(config: RememeConfig, substitute: DynamicImage) -> Self {
        Self {
            config,
            substitute: Arc::new(substitute),
            workers: num_cpus::get(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes every job; per-job failures are reported in the outcomes, only an
    /// unusable search space fails the whole batch.
    pub async fn run(&self, jobs: Vec<BatchJob>) -> Result<Vec<BatchOutcome>> {
        let space = self.config.search.space()?;
        let semaphore = Arc::new(Semaphore::new(self.workers));
        info!(jobs = jobs.len(), workers = self.workers, "starting batch");

        let tasks = jobs.into_iter().map(|job| {
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let substitute = Arc::clone(&self.substitute);
            async move {
                let template_path = job.template_path.clone();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => tokio::task::spawn_blocking(move || {
                        run_job(config, &space, &substitute, &job)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(SubstitutionError::WorkerFailed {
                            template: template_path.clone(),
                            message: e.to_string(),
                        })
                    }),
                    Err(e) => Err(SubstitutionError::WorkerFailed {
                        template: template_path.clone(),
                        message: e.to_string(),
                    }),
                };
                if let Err(err) = &result {
                    warn!(template = %template_path.display(), %err, "job failed");
                }
                BatchOutcome {
                    template_path,
                    result,
                }
            }
        });

        Ok(join_all(tasks).await)
    }
}

fn run_job(
    config: RememeConfig,
    space: &SearchSpace,
    substitute: &DynamicImage,
    job: &BatchJob,
) -> Result<JobStatus> {
    let template = image_io::load(&job.template_path)?;
    let mut engine = SubstitutionEngine::new(config);

    match search(&mut engine, &template, substitute, space)? {
        SearchReport::Found(found) => {
            if let Some(path) = &job.output_path {
                image_io::save_png(path, &found.image)?;
            }
            info!(template = %job.template_path.display(), params = %found.params, "placed");
            Ok(JobStatus::Placed {
                params: found.params,
                attempts: found.attempted.len(),
                output_path: job.output_path.clone(),
            })
        }
        SearchReport::NotFound { attempted } => Ok(JobStatus::NotFound {
            attempts: attempted.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{panel_template, red_substitute, seeded_config};
    use image::{Rgba, RgbaImage};

    fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let panel = dir.join("panel.png");
        let blank = dir.join("blank.png");
        image_io::save_png(&panel, &panel_template()).unwrap();
        let white = DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, Rgba([255; 4])));
        image_io::save_png(&blank, &white).unwrap();
        (panel, blank)
    }

    #[tokio::test]
    async fn batch_reports_each_template_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (panel, blank) = write_fixtures(dir.path());
        let missing = dir.path().join("missing.png");

        let mut config = seeded_config(21);
        config.search.max_clusters = 2;
        let runner = BatchRunner::new(config, red_substitute()).with_workers(2);

        let jobs = vec![
            BatchJob::into_dir(panel.clone(), dir.path()),
            BatchJob::into_dir(blank.clone(), dir.path()),
            BatchJob::into_dir(missing.clone(), dir.path()),
        ];
        let outcomes = runner.run(jobs).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].template_path, panel);
        let expected_output = dir.path().join("panel_rememe.png");
        assert_eq!(
            outcomes[0].result.as_ref().unwrap(),
            &JobStatus::Placed {
                params: SubstitutionParams::WhiteFallback,
                attempts: 1,
                output_path: Some(expected_output.clone()),
            }
        );
        assert!(expected_output.exists());

        assert_eq!(
            outcomes[1].result.as_ref().unwrap(),
            &JobStatus::NotFound { attempts: 3 }
        );
        assert!(matches!(
            outcomes[2].result,
            Err(SubstitutionError::ImageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn inverted_search_range_fails_the_batch() {
        let mut config = RememeConfig::default();
        config.search.min_clusters = 4;
        config.search.max_clusters = 1;
        let runner = BatchRunner::new(config, red_substitute());
        assert!(runner.run(Vec::new()).await.is_err());
    }

    #[test]
    fn worker_count_is_at_least_one() {
        let runner = BatchRunner::new(RememeConfig::default(), red_substitute()).with_workers(0);
        assert_eq!(runner.workers(), 1);
    }
}
