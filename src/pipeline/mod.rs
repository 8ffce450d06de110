//! The Fetch -> Execute -> Write pipeline: pure per-tile stage functions
//! in [`fetch`], [`execute`], and [`write`], plus two drivers over them —
//! [`run_sequential`], which fully drains one stage before the next tile
//! starts the next, and (behind the `pipelined` feature) [`run_pipelined`],
//! three workers connected by bounded queues. Both drivers call the exact
//! same stage functions in the exact same order, so they produce
//! byte-identical output; only wall-clock overlap differs.

pub mod execute;
pub mod fetch;
pub mod write;

use crate::buffers::{AccumBuffer, InputCache, PsumBuffer, TileConfig, WeightCache};
use crate::fixed::Word256;
use crate::job::JobParams;
use crate::schedule::{Schedule, TileGeometry};
use crate::tensor::{AffineView, InputView, OutputView, WeightView};

/// Depth of each inter-stage queue, in tiles, for the pipelined driver.
/// A few tiles of slack lets Fetch run ahead of Execute (and Execute
/// ahead of Write) without every handoff blocking.
#[cfg(feature = "pipelined")]
const QUEUE_DEPTH: usize = 4;

/// One `(tr, tc, ti, to)` tile's input and weight streams, handed from
/// Fetch to Execute.
struct FetchPacket {
    geom: TileGeometry,
    input_words: Vec<Word256>,
    weight_words: Vec<Word256>,
}

/// One `(tr, tc, to)` tile's finished output words, handed from Execute
/// to Write. Only produced on the last IC tile.
struct ExecutePacket {
    geom: TileGeometry,
    output_words: Vec<Word256>,
}

#[allow(clippy::too_many_arguments)]
fn fetch_tile(
    input_cache: &mut InputCache,
    weight_cache: &mut WeightCache,
    input_view: &InputView,
    weight_view: &WeightView,
    config: &TileConfig,
    params: &JobParams,
    geom: TileGeometry,
) -> FetchPacket {
    // The input cache is reused across every OC tile of one IC tile; only
    // refill it when this is the first OC tile (`to == 0`).
    if geom.to == 0 {
        fetch::fill_input_cache(input_cache, input_view, &geom, config.tile_ic);
    }
    fetch::fill_weight_cache(
        weight_cache,
        weight_view,
        &geom,
        config.tile_oc,
        config.tile_ic,
        params.k,
    );
    let input_words =
        fetch::stream_input_words(input_cache, &geom, params.k, params.s, config.tile_ic);
    let weight_words =
        fetch::stream_weight_words(weight_cache, params.k, config.tile_oc, config.tile_ic);
    FetchPacket {
        geom,
        input_words,
        weight_words,
    }
}

fn execute_packet(
    accum: &mut AccumBuffer,
    psum: &mut PsumBuffer,
    affine: &AffineView,
    config: &TileConfig,
    params: &JobParams,
    packet: FetchPacket,
) -> Option<ExecutePacket> {
    let geom = packet.geom;
    execute::execute_tile(
        accum,
        psum,
        affine,
        &geom,
        &packet.input_words,
        &packet.weight_words,
        params.k,
        config.tile_oc,
        config.tile_ic,
        params.activation,
    )
    .map(|output_words| ExecutePacket { geom, output_words })
}

#[allow(clippy::too_many_arguments)]
fn write_packet(
    output: &mut OutputView,
    config: &TileConfig,
    params: &JobParams,
    pre_pool_oh: usize,
    pre_pool_ow: usize,
    final_oh: usize,
    final_ow: usize,
    packet: ExecutePacket,
) {
    let buf = write::demux_tile(&packet.output_words, &packet.geom, config.tile_oc);
    if params.use_pool {
        write::place_tile_pooled(
            output,
            &buf,
            &packet.geom,
            config.tile_oc,
            params.oc,
            final_oh,
            final_ow,
        );
    } else {
        write::place_tile(
            output,
            &buf,
            &packet.geom,
            config.tile_oc,
            params.oc,
            pre_pool_oh,
            pre_pool_ow,
        );
    }
}

/// Parameters shared by both drivers, bundled to keep their signatures
/// readable.
pub struct DriverInputs<'a, 'b> {
    /// Tile schedule for this invocation.
    pub schedule: &'a Schedule,
    /// Tile edges this `Engine` was built for.
    pub config: &'a TileConfig,
    /// This invocation's geometry and mode.
    pub params: &'a JobParams,
    /// Input activation view.
    pub input_view: &'a InputView<'b>,
    /// Weight tensor view.
    pub weight_view: &'a WeightView<'b>,
    /// Fused-affine view.
    pub affine: &'a AffineView<'b>,
    /// Pre-pool output height and width.
    pub pre_pool_oh: usize,
    /// Pre-pool output height and width.
    pub pre_pool_ow: usize,
    /// Final (post-pool, if enabled) output height and width.
    pub final_oh: usize,
    /// Final (post-pool, if enabled) output height and width.
    pub final_ow: usize,
}

/// Drive the pipeline stage-by-stage, one tile at a time: fetch this
/// tile, execute it, and (on the last IC tile) write it, before moving to
/// the next tile. Forfeits overlap between stages but needs no threads.
#[allow(clippy::too_many_arguments)]
pub fn run_sequential(
    inputs: &DriverInputs<'_, '_>,
    output: &mut OutputView,
    input_cache: &mut InputCache,
    weight_cache: &mut WeightCache,
    accum: &mut AccumBuffer,
    psum: &mut PsumBuffer,
) {
    for geom in inputs.schedule.iter() {
        let packet = fetch_tile(
            input_cache,
            weight_cache,
            inputs.input_view,
            inputs.weight_view,
            inputs.config,
            inputs.params,
            geom,
        );
        if let Some(exec_packet) =
            execute_packet(accum, psum, inputs.affine, inputs.config, inputs.params, packet)
        {
            write_packet(
                output,
                inputs.config,
                inputs.params,
                inputs.pre_pool_oh,
                inputs.pre_pool_ow,
                inputs.final_oh,
                inputs.final_ow,
                exec_packet,
            );
        }
    }
}

/// Drive the pipeline as three workers connected by bounded queues: a
/// Fetch thread, an Execute thread, and Write running on the calling
/// thread. Each thread owns disjoint on-chip buffers, so there is no
/// shared mutable state beyond the channels themselves.
#[cfg(feature = "pipelined")]
pub fn run_pipelined(
    inputs: &DriverInputs<'_, '_>,
    output: &mut OutputView,
    input_cache: &mut InputCache,
    weight_cache: &mut WeightCache,
    accum: &mut AccumBuffer,
    psum: &mut PsumBuffer,
) {
    let (fetch_tx, fetch_rx) = crossbeam_channel::bounded::<FetchPacket>(QUEUE_DEPTH);
    let (exec_tx, exec_rx) = crossbeam_channel::bounded::<ExecutePacket>(QUEUE_DEPTH);

    std::thread::scope(|scope| {
        scope.spawn(move || {
            for geom in inputs.schedule.iter() {
                let packet = fetch_tile(
                    input_cache,
                    weight_cache,
                    inputs.input_view,
                    inputs.weight_view,
                    inputs.config,
                    inputs.params,
                    geom,
                );
                if fetch_tx.send(packet).is_err() {
                    break;
                }
            }
        });

        scope.spawn(move || {
            while let Ok(packet) = fetch_rx.recv() {
                if let Some(exec_packet) =
                    execute_packet(accum, psum, inputs.affine, inputs.config, inputs.params, packet)
                {
                    if exec_tx.send(exec_packet).is_err() {
                        break;
                    }
                }
            }
        });

        for packet in &exec_rx {
            write_packet(
                output,
                inputs.config,
                inputs.params,
                inputs.pre_pool_oh,
                inputs.pre_pool_ow,
                inputs.final_oh,
                inputs.final_ow,
                packet,
            );
        }
    });
}
