use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use talava_replay::config::Config;
use talava_replay::playback::{Synchronizer, Tick};
use talava_replay::scaler::ScalerRegistry;
use talava_replay::trajectory::{PredictionFrame, ReferenceFrame, Trajectory, PREDICTION};

const CONFIG_PATH: &str = "config.toml";

fn print_tick(tick: &Tick) {
    let r = tick.reference;
    println!("[{}]", tick.index);
    println!("  head:     {:?}", r.head.position);
    println!("  tracker:  {:?}", r.tracker.position);
    if let Some(aligned) = tick.aligned {
        println!("  予測:     {:?}  euler {:?}", aligned.position, aligned.euler_degrees);
    }
    if let Some(err) = tick.position_error() {
        println!("  誤差:     {:.4} m", err);
    }
}

/// Enter が押されるまで target_fps で連続再生する。末尾では先頭に戻って続ける。
fn play_through(sync: &mut Synchronizer, frame_duration: Duration) {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let waiter = std::thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        stop_flag.store(true, Ordering::Relaxed);
    });

    sync.play();
    let start = Instant::now();
    let mut frames = 0u32;
    while !stop.load(Ordering::Relaxed) {
        let tick_start = Instant::now();
        match sync.tick() {
            Ok(Some(tick)) => {
                frames += 1;
                if let Some(err) = tick.position_error() {
                    print!("\r  [{}] 誤差 {:.4} m   ", tick.index, err);
                } else {
                    print!("\r  [{}]   ", tick.index);
                }
                let _ = io::stdout().flush();
            }
            // 先頭に戻った
            Ok(None) => {}
            Err(e) => {
                println!();
                println!("停止: {} (Enter で戻ります)", e);
                break;
            }
        }
        if let Some(rest) = frame_duration.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    sync.pause();
    // 入力待ちのスレッドが次のコマンド行を読まないよう、ここで回収する
    let _ = waiter.join();
    println!();
    println!("{} フレーム再生 ({:.1}s)", frames, start.elapsed().as_secs_f32());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path))?;
    let rc = &config.replay;

    println!("=== Talava Replay ===");
    println!("参照:   {} ({:?})", rc.reference_path, rc.reference_layout);
    println!("予測:   {}", rc.prediction_path.as_deref().unwrap_or("-"));
    println!("scaler: {}", rc.scaler_path.as_deref().unwrap_or("-"));
    println!("FPS:    {}", rc.target_fps);
    println!();

    let reference = Trajectory::<ReferenceFrame>::load(
        &rc.reference_path,
        rc.reference_layout.schema(),
        rc.delimiter,
    )
    .with_context(|| format!("Failed to load reference trajectory: {}", rc.reference_path))?;

    let prediction = rc
        .prediction_path
        .as_ref()
        .map(|path| {
            Trajectory::<PredictionFrame>::load(path, &PREDICTION, rc.delimiter)
                .with_context(|| format!("Failed to load prediction trajectory: {}", path))
        })
        .transpose()?;

    let scalers = rc
        .scaler_path
        .as_ref()
        .map(|path| {
            ScalerRegistry::load(path)
                .with_context(|| format!("Failed to load scalers: {}", path))
        })
        .transpose()?;

    let mut rng = match rc.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut sync = Synchronizer::new();
    sync.attach_reference(&reference);
    if let Some(prediction) = &prediction {
        sync.attach_prediction(prediction);
    }
    if let Some(scalers) = &scalers {
        sync.attach_scalers(scalers);
    }

    let frame_duration = Duration::from_secs_f64(1.0 / rc.target_fps.max(1) as f64);

    println!("{} フレーム読み込み", sync.len()?);
    println!();
    println!("コマンド:");
    println!("  m             - 連続再生 (Enter で停止)");
    println!("  l             - 1フレーム進める");
    println!("  n             - ランダムな位置へ移動");
    println!("  g i           - i 番目へ移動");
    println!("  c             - 現在のフレームを表示");
    println!("  d             - 逆変換した予測トラッカー位置を表示");
    println!("  e             - 位置誤差を集計");
    println!("  q             - 終了");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "m" => play_through(&mut sync, frame_duration),
            "l" => match sync.step() {
                Ok(Some(tick)) => print_tick(&tick),
                Ok(None) => println!("先頭に戻りました"),
                Err(e) => println!("エラー: {}", e),
            },
            "n" => match sync.seek_random(&mut rng) {
                Ok(index) => println!("移動: {}", index),
                Err(e) => println!("エラー: {}", e),
            },
            "g" if parts.len() == 2 => {
                let target: isize = match parts[1].parse() {
                    Ok(v) => v,
                    Err(_) => {
                        println!("不正なインデックス: {}", parts[1]);
                        continue;
                    }
                };
                match sync.seek(target) {
                    Ok(()) => println!("移動: {}", target),
                    Err(e) => println!("エラー: {}", e),
                }
            }
            "c" => match sync.current() {
                Ok(tick) => print_tick(&tick),
                Err(e) => println!("エラー: {}", e),
            },
            "d" => match sync.denormalized_tracker_position() {
                Ok(p) => println!("逆変換: {:?}", p),
                Err(e) => println!("エラー: {}", e),
            },
            "e" => match sync.evaluate() {
                Ok(eval) => {
                    println!("フレーム数: {}", eval.frames);
                    println!("  平均誤差: {:.4} m", eval.mean_position_error);
                    println!("  最大誤差: {:.4} m", eval.max_position_error);
                }
                Err(e) => println!("エラー: {}", e),
            },
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    Ok(())
}
