//! UCI front end: reads commands on stdin, runs searches on a worker
//! thread, and streams `info`/`bestmove` back on stdout. The reader owns
//! the stop flag; the search observes it between deepening iterations.

use sable::board::Board;
use sable::board::Color;
use sable::moves::movegen::is_legal;
use sable::moves::perft::perft_divide;
use sable::moves::types::Move;
use sable::search::MoveProbe;
use sable::search::search::{SearchInfo, SearchLimits, Searcher};
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const ENGINE_NAME: &str = "Sable 0.1";
const ENGINE_AUTHOR: &str = "the sable authors";

/// Time reserved per move when only the clock is known: assume the game
/// lasts another `MOVES_TO_GO_FALLBACK` moves.
const MOVES_TO_GO_FALLBACK: u64 = 100;
/// Below this much clock, skip depths predicted to overrun.
const STRICT_TIME_THRESHOLD_MS: u64 = 30_000;

const SEARCH_THREAD_STACK: usize = 16 * 1024 * 1024;

struct Engine {
    board: Board,
    pos_history: HashSet<u64>,
    debug: bool,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// Opening book / tablebase hook; answers `go` without searching.
    probe: Option<Box<dyn MoveProbe>>,
}

impl Engine {
    fn new() -> Self {
        let board = Board::new();
        let mut pos_history = HashSet::new();
        pos_history.insert(board.piece_state_key());
        Engine {
            board,
            pos_history,
            debug: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            probe: None,
        }
    }

    /// Blocks until the running search (if any) has produced its bestmove.
    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn stop_search(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.join_worker();
    }
}

fn main() {
    #[cfg(feature = "cli")]
    sable::logger::init_logging("logs/sable.log", "info");

    let mut engine = Engine::new();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "uci" => {
                println!("id name {}", ENGINE_NAME);
                println!("id author {}", ENGINE_AUTHOR);
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "debug" => {
                match parts.get(1) {
                    Some(&"on") => engine.debug = true,
                    Some(&"off") => engine.debug = false,
                    _ => tracing::warn!(%line, "unparseable debug command"),
                }
            }
            "ucinewgame" => {
                engine.stop_search();
                engine.board = Board::new();
                engine.pos_history.clear();
                engine.pos_history.insert(engine.board.piece_state_key());
            }
            "position" => handle_position(&mut engine, &parts),
            "go" => handle_go(&mut engine, &parts),
            "stop" => engine.stop_search(),
            "quit" => {
                engine.stop_search();
                break;
            }
            "d" | "display" | "fen" => println!("{}", engine.board.to_fen()),
            "perft" => {
                if let Some(depth) = parts.get(1).and_then(|d| d.parse().ok()) {
                    let mut scratch = engine.board.clone();
                    perft_divide(&mut scratch, depth);
                }
            }
            _ => tracing::warn!(%line, "unsupported command"),
        }
    }

    engine.stop_search();
}

/// `position startpos|fen <6 fields> [moves m1 m2 ...]`. An invalid FEN or
/// an illegal move rejects the whole command: the previous position stays,
/// so the next `go` is still well-defined.
fn handle_position(engine: &mut Engine, parts: &[&str]) {
    engine.join_worker();

    let moves_idx = parts.iter().position(|&p| p == "moves");

    let parsed = match parts.get(1) {
        Some(&"startpos") => Ok(Board::new()),
        Some(&"fen") => {
            let fen_end = moves_idx.unwrap_or(parts.len());
            let fen = parts[2..fen_end].join(" ");
            Board::from_fen(&fen).map_err(|e| e.to_string())
        }
        _ => Err("expected startpos or fen".to_string()),
    };

    let mut board = match parsed {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "position rejected");
            eprintln!("info string invalid position: {}", e);
            return;
        }
    };

    let mut history = HashSet::new();
    history.insert(board.piece_state_key());

    if let Some(idx) = moves_idx {
        for token in &parts[idx + 1..] {
            let mv = match token.parse::<Move>() {
                Ok(mv) if is_legal(&board, mv) => mv,
                _ => {
                    tracing::warn!(%token, "illegal move in position command");
                    eprintln!("info string illegal move: {}", token);
                    return;
                }
            };
            board.make(mv);
            history.insert(board.piece_state_key());
        }
    }

    engine.board = board;
    engine.pos_history = history;
}

fn handle_go(engine: &mut Engine, parts: &[&str]) {
    // Searches are serialized: a new go waits for the previous bestmove.
    engine.join_worker();

    if let Some(probe) = &engine.probe
        && let Some(mv) = probe.probe(&engine.board)
    {
        println!("bestmove {}", mv);
        return;
    }

    let mut depth: Option<u32> = None;
    let mut movetime: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut movestogo: Option<u64> = None;
    let mut infinite = false;

    let mut i = 1;
    while i < parts.len() {
        let value = parts.get(i + 1).and_then(|v| v.parse::<u64>().ok());
        match parts[i] {
            "depth" => {
                depth = value.map(|v| v as u32);
                i += 2;
            }
            "movetime" => {
                movetime = value;
                i += 2;
            }
            "wtime" => {
                wtime = value;
                i += 2;
            }
            "btime" => {
                btime = value;
                i += 2;
            }
            "winc" | "binc" => i += 2,
            "movestogo" => {
                movestogo = value;
                i += 2;
            }
            "infinite" => {
                infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    let limits = if infinite {
        SearchLimits::depth(64)
    } else if let Some(d) = depth {
        SearchLimits::depth(d)
    } else if let Some(ms) = movetime {
        SearchLimits::movetime(Duration::from_millis(ms), false)
    } else {
        let own_time = match engine.board.side_to_move {
            Color::White => wtime,
            Color::Black => btime,
        };
        match own_time {
            Some(total) => {
                let budget = total / movestogo.unwrap_or(MOVES_TO_GO_FALLBACK).max(1);
                SearchLimits::movetime(
                    Duration::from_millis(budget.max(1)),
                    total < STRICT_TIME_THRESHOLD_MS,
                )
            }
            None => SearchLimits::depth(64),
        }
    };

    if engine.debug && let Some(budget) = limits.max_movetime {
        println!("info string target time {}ms", budget.as_millis());
    }

    engine.stop_flag.store(false, Ordering::Relaxed);
    let stop_flag = Arc::clone(&engine.stop_flag);
    let mut board = engine.board.clone();
    let pos_history = engine.pos_history.clone();
    let debug = engine.debug;

    let handle = std::thread::Builder::new()
        .name("search".to_string())
        .stack_size(SEARCH_THREAD_STACK)
        .spawn(move || {
            let mut searcher = Searcher::with_cancel(stop_flag);
            searcher.set_position_history(pos_history);

            let result = searcher.search(&mut board, &limits, &mut |info: SearchInfo| {
                let pv: Vec<String> = info.pv.iter().map(|m| m.to_string()).collect();
                println!(
                    "info depth {} time {} nodes {} nps {} score cp {} pv {}",
                    info.depth,
                    info.time_ms,
                    info.nodes,
                    info.nps,
                    info.score_cp,
                    pv.join(" ")
                );
            });

            if debug {
                tracing::info!(nodes = searcher.nodes(), "search finished");
            }

            match result.best_move {
                Some(mv) => println!("bestmove {}", mv),
                None => println!("bestmove (none)"),
            }
        })
        .expect("spawn search thread");

    engine.worker = Some(handle);
}
