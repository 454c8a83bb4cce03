//! Generate a deterministic synthetic report corpus for local testing:
//! one HTML file per weekday under `<root>/<YYYY>/<MM>/`, weekends left out
//! so the missing-day path gets exercised.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Weekday};

fn gaussian_drift(day_of_month: f64, rail: f64) -> f64 {
    // slow bow of the rail plus a day-dependent thermal term
    0.4 * (-(rail - 20.0).powi(2) / 180.0).exp() + 0.05 * (day_of_month / 31.0 - 0.5)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn report_html(date: NaiveDate, rng: &mut SimpleRng) -> String {
    let humidity = 35.0 + 15.0 * rng.next_f64();
    let mut html = String::with_capacity(8 * 1024);

    let _ = writeln!(html, "<!DOCTYPE html><html><head><title>Corrections {date}</title></head><body>");
    let _ = writeln!(html, "<h2>Daily rail correction report</h2>");
    let _ = writeln!(html, "<h3>Tunnel relative humidity: {humidity:.1}%</h3>");

    for line in 1..=3u32 {
        let hour = 6 + rng.next_u64() % 4;
        let _ = writeln!(html, "<table border=\"1\">");
        let _ = writeln!(
            html,
            "<tr><td>Timestamp</td><td>{date} {hour:02}:{:02}:00</td></tr>",
            rng.next_u64() % 60
        );
        let _ = writeln!(html, "<tr><td>Delay line number</td><td>{line}</td></tr>");
        let _ = writeln!(html, "</table>");

        let _ = writeln!(html, "<table border=\"1\">");
        let _ = writeln!(
            html,
            "<tr><th>Rail number</th><th>Correction [µm]</th><th>Sensor</th></tr>"
        );
        // each line reports a handful of corrected positions
        let n_rows = 4 + rng.next_u64() % 6;
        let mut rail = 1 + rng.next_u64() % 4;
        for _ in 0..n_rows {
            let base = gaussian_drift(date.day() as f64, rail as f64);
            let correction = rng.gauss(base, 0.15);
            let _ = writeln!(
                html,
                "<tr><td>{rail}</td><td>{correction:.3}</td><td>S{line}{rail:02}</td></tr>"
            );
            rail += 1 + rng.next_u64() % 5;
        }
        let _ = writeln!(html, "</table>");
    }

    let _ = writeln!(html, "</body></html>");
    html
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let start: NaiveDate = args
        .next()
        .unwrap_or_else(|| "2024-03-01".to_string())
        .parse()
        .expect("start date must be YYYY-MM-DD");
    let end: NaiveDate = args
        .next()
        .unwrap_or_else(|| "2024-03-31".to_string())
        .parse()
        .expect("end date must be YYYY-MM-DD");

    let mut rng = SimpleRng::new(42);
    let mut written = 0usize;

    let mut day = start;
    while day <= end {
        // no reports on weekends
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let dir = root
                .join(day.format("%Y").to_string())
                .join(day.format("%m").to_string());
            std::fs::create_dir_all(&dir).expect("creating corpus directory");
            let path = dir.join(format!("corrections_report_{day}.html"));
            std::fs::write(&path, report_html(day, &mut rng)).expect("writing report file");
            written += 1;
        }
        day = match day.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }

    println!("Wrote {written} reports under {}", root.display());
}
