use once_cell::sync::OnceCell;
use onnxruntime::{environment::Environment, session::Session};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tokenizers::Tokenizer;

use crate::assets::ModelAssets;
use crate::SemanticError;

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

type Vectors = Result<Vec<Vec<f32>>, SemanticError>;

/// Tokenizer and ONNX session for one model.
pub(crate) struct LoadedSession {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) session: Session<'static>,
}

impl LoadedSession {
    pub(crate) fn load(assets: &ModelAssets) -> Result<Self, SemanticError> {
        let tokenizer = Tokenizer::from_file(&assets.tokenizer_path).map_err(|e| {
            SemanticError::ModelLoadFailure(format!(
                "tokenizer {}: {e}",
                assets.tokenizer_path.display()
            ))
        })?;

        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::ModelLoadFailure(e.to_string()))?
            .with_model_from_file(assets.model_path.clone())
            .map_err(|e| {
                SemanticError::ModelLoadFailure(format!(
                    "onnx session {}: {e}",
                    assets.model_path.display()
                ))
            })?;

        Ok(Self { tokenizer, session })
    }
}

struct EmbedJob {
    texts: Vec<String>,
    reply: Sender<Vectors>,
}

/// A dedicated thread that owns one model runner and serves embed jobs.
///
/// ONNX sessions are not `Send`, so the session is built on this thread and
/// never leaves it. Every embed, from any caller thread, goes through the
/// channel to that one session. The thread exits once the handle is dropped.
#[derive(Debug, Clone)]
pub(crate) struct SessionThread {
    jobs: Sender<EmbedJob>,
}

impl SessionThread {
    /// Spawns the thread, runs `build` on it and waits for the result.
    pub(crate) fn spawn<B, R>(name: &str, build: B) -> Result<Self, SemanticError>
    where
        B: FnOnce() -> Result<R, SemanticError> + Send + 'static,
        R: FnMut(&[String]) -> Vectors + 'static,
    {
        let (jobs, inbox) = mpsc::channel::<EmbedJob>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let label = name.to_string();

        thread::Builder::new()
            .name("semsearch-onnx".into())
            .spawn(move || match build() {
                Ok(runner) => {
                    let _ = ready_tx.send(Ok(()));
                    serve(&label, runner, inbox);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| SemanticError::ModelLoadFailure(format!("session thread: {e}")))?;

        ready_rx.recv().map_err(|_| {
            SemanticError::ModelLoadFailure("session thread exited during load".into())
        })??;
        Ok(Self { jobs })
    }

    /// Blocks until the session thread has embedded `texts`.
    pub(crate) fn run(&self, texts: Vec<String>) -> Vectors {
        let (reply, answer) = mpsc::channel();
        self.jobs
            .send(EmbedJob { texts, reply })
            .map_err(|_| SemanticError::Embedding("session thread has stopped".into()))?;
        answer
            .recv()
            .map_err(|_| SemanticError::Embedding("session thread dropped the request".into()))?
    }
}

fn serve<R>(model: &str, mut runner: R, inbox: Receiver<EmbedJob>)
where
    R: FnMut(&[String]) -> Vectors,
{
    tracing::debug!(model, "onnx session thread started");
    while let Ok(EmbedJob { texts, reply }) = inbox.recv() {
        // caller may have gone away
        let _ = reply.send(runner(&texts));
    }
    tracing::debug!(model, "onnx session thread stopped");
}

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("semsearch")
            .build()
            .map_err(|e| SemanticError::ModelLoadFailure(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_thread(builds: Arc<AtomicUsize>) -> SessionThread {
        SessionThread::spawn("test", move || {
            builds.fetch_add(1, Ordering::SeqCst);
            // not Send: the runner has to stay on the session thread
            let owner = Rc::new(thread::current().id());
            Ok(move |texts: &[String]| -> Vectors {
                assert_eq!(*owner, thread::current().id());
                Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
            })
        })
        .unwrap()
    }

    #[test]
    fn builds_once_and_serves_every_thread() {
        let builds = Arc::new(AtomicUsize::new(0));
        let session = counting_thread(Arc::clone(&builds));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let session = session.clone();
                thread::spawn(move || session.run(vec!["x".repeat(i + 1)]).unwrap())
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), vec![vec![(i + 1) as f32]]);
        }

        // a thread that did not exist at load time reuses the same session
        let later = session.clone();
        let out = thread::spawn(move || later.run(vec!["abc".into()]).unwrap())
            .join()
            .unwrap();
        assert_eq!(out, vec![vec![3.0]]);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn build_error_is_returned_to_the_caller() {
        let err = SessionThread::spawn("broken", || {
            Err::<fn(&[String]) -> Vectors, _>(SemanticError::ModelLoadFailure("no model".into()))
        })
        .unwrap_err();
        assert!(matches!(err, SemanticError::ModelLoadFailure(ref m) if m == "no model"));
    }

    #[test]
    fn runner_errors_reach_the_caller() {
        let session = SessionThread::spawn("failing", || {
            Ok(|_: &[String]| -> Vectors { Err(SemanticError::Embedding("bad input".into())) })
        })
        .unwrap();
        let err = session.run(vec!["x".into()]).unwrap_err();
        assert!(matches!(err, SemanticError::Embedding(_)));
    }
}
