use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use tm_core::config::{DitherMode, MosaicConfig, Sampling};
use tm_core::frame::{FrameBuffer, SourceFrame};
use tm_core::tile::TileSet;
use tm_mosaic::FramePipeline;

fn gradient_frame(width: u32, height: u32) -> FrameBuffer {
    let mut fb = FrameBuffer::new(width, height);
    let stride = fb.stride();
    for y in 0..height as usize {
        for x in 0..width as usize {
            let v = ((x + y) % 256) as u8;
            fb.data[y * stride + x * 3..][..3].copy_from_slice(&[v, v / 2, 255 - v]);
        }
    }
    fb
}

fn bench_pipeline(c: &mut Criterion) {
    let input = SourceFrame {
        index: 0,
        pts_secs: 0.0,
        frame: gradient_frame(1280, 720),
    };
    let tiles = Arc::new(TileSet::solid(8));

    let mut group = c.benchmark_group("process_720p_block8");
    for (name, mode, sampling) in [
        ("none_area", DitherMode::None, Sampling::Area),
        ("ordered_area", DitherMode::Ordered, Sampling::Area),
        ("diffusion_area", DitherMode::ErrorDiffusion, Sampling::Area),
        ("diffusion_block_mean", DitherMode::ErrorDiffusion, Sampling::BlockMean),
    ] {
        let config = MosaicConfig {
            block_size: 8,
            dither_mode: mode,
            sampling,
            ..MosaicConfig::default()
        };
        let Ok(pipeline) = FramePipeline::new(config, Arc::clone(&tiles)) else {
            continue;
        };
        group.bench_function(name, |b| {
            b.iter(|| black_box(pipeline.process(black_box(&input))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
