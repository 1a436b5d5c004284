// Ordonnancement multi-frames.
//
//   lecteur ──(SourceFrame)──▶ N workers ──(index, résultat)──▶ collecteur (thread appelant)
//
// Le lecteur prend un jeton avant chaque frame et le collecteur le rend une fois
// la frame écrite : au plus `in_flight_limit(N)` frames lues mais pas encore écrites,
// tampon de réordonnancement compris. Le collecteur réordonne par index d'entrée
// avant d'écrire dans le sink.

use std::thread;

use flume::{Receiver, Sender};
use tm_core::error::MosaicError;
use tm_core::frame::{FrameBuffer, SourceFrame};
use tm_core::traits::{FrameSink, FrameSource};

use crate::pipeline::FramePipeline;
use crate::reorder::ReorderBuffer;

type FrameResult = (u64, Result<FrameBuffer, MosaicError>);

/// Frames read from the source but not yet written to the sink, at most.
#[must_use]
pub fn in_flight_limit(workers: usize) -> usize {
    workers.max(1) * 4
}

/// Fait passer toutes les frames de `source` dans `pipeline` et les écrit dans `sink`, dans l'ordre.
///
/// Frames are transformed on `workers` threads (at least one). `on_frame` is called on the
/// calling thread with the running count after each frame reaches the sink.
///
/// Returns the number of frames written.
///
/// # Errors
/// The first error raised by the source, the pipeline or the sink. Remaining
/// threads are stopped and frames still in flight are dropped.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tm_core::config::MosaicConfig;
/// use tm_core::error::MosaicError;
/// use tm_core::frame::FrameBuffer;
/// use tm_core::tile::TileSet;
/// use tm_core::traits::{FrameRate, FrameSink};
/// use tm_mosaic::{FramePipeline, run_frames};
/// use tm_source::MemorySource;
///
/// struct Count(u64);
/// impl FrameSink for Count {
///     fn write_frame(&mut self, _: &FrameBuffer) -> Result<(), MosaicError> { self.0 += 1; Ok(()) }
/// }
///
/// let config = MosaicConfig { block_size: 2, ..MosaicConfig::default() };
/// let pipeline = FramePipeline::new(config, Arc::new(TileSet::solid(2))).unwrap();
/// let mut source = MemorySource::new(vec![FrameBuffer::new(4, 4); 5], FrameRate::default());
/// let mut sink = Count(0);
/// let written = run_frames(&mut source, &pipeline, &mut sink, 2, |_| {}).unwrap();
/// assert_eq!((written, sink.0), (5, 5));
/// ```
pub fn run_frames<S, K, F>(
    source: &mut S,
    pipeline: &FramePipeline,
    sink: &mut K,
    workers: usize,
    mut on_frame: F,
) -> Result<u64, MosaicError>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    F: FnMut(u64),
{
    let workers = workers.max(1);
    let (job_tx, job_rx) = flume::bounded::<SourceFrame>(workers * 2);
    let (result_tx, result_rx) = flume::bounded::<FrameResult>(workers * 2);
    let (permit_tx, permit_rx) = flume::bounded::<()>(in_flight_limit(workers));
    log::info!(
        "Traitement sur {workers} worker(s), {} frame(s) en vol au plus",
        in_flight_limit(workers)
    );

    thread::scope(|scope| -> Result<u64, MosaicError> {
        let reader_tx = result_tx.clone();
        thread::Builder::new()
            .name("tm-reader".into())
            .spawn_scoped(scope, move || {
                read_frames(source, &permit_tx, &job_tx, &reader_tx);
            })
            .map_err(|e| MosaicError::Worker(format!("lancement du lecteur : {e}")))?;

        for id in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            thread::Builder::new()
                .name(format!("tm-worker-{id}"))
                .spawn_scoped(scope, move || transform_frames(pipeline, &jobs, &results))
                .map_err(|e| MosaicError::Worker(format!("lancement du worker {id} : {e}")))?;
        }
        // Seuls les threads gardent des extrémités : le canal se ferme quand ils ont fini
        drop(job_rx);
        drop(result_tx);

        let outcome = collect_in_order(&result_rx, &permit_rx, sink, &mut on_frame);
        // Débloque lecteur et workers en cas d'abandon
        drop(result_rx);
        drop(permit_rx);
        outcome
    })
}

/// Boucle du lecteur. Une erreur de la source est transmise au collecteur comme résultat.
fn read_frames<S: FrameSource + ?Sized>(
    source: &mut S,
    permits: &Sender<()>,
    jobs: &Sender<SourceFrame>,
    results: &Sender<FrameResult>,
) {
    loop {
        // Bloque tant que trop de frames attendent d'être écrites
        if permits.send(()).is_err() {
            break;
        }
        match source.next_frame() {
            Ok(Some(frame)) => {
                if jobs.send(frame).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let index = match &e {
                    MosaicError::FrameDecode { index, .. } => *index,
                    _ => u64::MAX,
                };
                let _ = results.send((index, Err(e)));
                break;
            }
        }
    }
    log::debug!("Lecteur terminé");
}

fn transform_frames(
    pipeline: &FramePipeline,
    jobs: &Receiver<SourceFrame>,
    results: &Sender<FrameResult>,
) {
    for input in jobs.iter() {
        let result = pipeline.process(&input);
        if results.send((input.index, result)).is_err() {
            break;
        }
    }
}

/// Collecteur : réordonne les résultats et les écrit dans le sink.
fn collect_in_order<K, F>(
    results: &Receiver<FrameResult>,
    permits: &Receiver<()>,
    sink: &mut K,
    on_frame: &mut F,
) -> Result<u64, MosaicError>
where
    K: FrameSink + ?Sized,
    F: FnMut(u64),
{
    let mut reorder = ReorderBuffer::new();
    let mut written = 0u64;

    for (index, result) in results.iter() {
        reorder.push(index, result?);
        while let Some(frame) = reorder.pop_ready() {
            sink.write_frame(&frame)?;
            let _ = permits.try_recv();
            written += 1;
            on_frame(written);
        }
    }

    if !reorder.is_empty() {
        return Err(MosaicError::Worker(format!(
            "{} frame(s) jamais émises après la frame {}",
            reorder.pending_len(),
            reorder.next_seq()
        )));
    }
    log::info!("{written} frame(s) écrites");
    Ok(written)
}
