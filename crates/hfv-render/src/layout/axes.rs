/// Axis configuration with tick generation and data→pixel mapping.
///
/// Tick labels are TLatex markup (`10^{-3}`) and are drawn through the
/// canvas latex path.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub log: bool,
    pub label: String,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub minor_ticks: Vec<f64>,
}

impl Axis {
    /// Linear axis over exactly `[min, max]` with "nice number" ticks inside it.
    pub fn linear(min: f64, max: f64, target_ticks: usize) -> Self {
        let (min, max) = ordered(min, max);
        let step = nice_step((max - min) / (target_ticks.max(2) - 1) as f64);
        let tol = step * 1e-6;
        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let mut k = (min / step - 1e-6).ceil();
        while k * step <= max + tol {
            let v = k * step;
            ticks.push(v);
            labels.push(format_tick(v, step));
            k += 1.0;
        }

        // Minor ticks: 5 subdivisions per major, also below the first and above the last
        let minor_step = step / 5.0;
        let mut minor = Vec::new();
        let mut k = (min / minor_step - 1e-6).ceil();
        while k * minor_step <= max + tol {
            let mv = k * minor_step;
            if !ticks.iter().any(|t| (t - mv).abs() < minor_step * 0.01) {
                minor.push(mv);
            }
            k += 1.0;
        }

        Self {
            min,
            max,
            log: false,
            label: String::new(),
            tick_positions: ticks,
            tick_labels: labels,
            minor_ticks: minor,
        }
    }

    /// Logarithmic axis over `[min, max]`; non-positive limits are clamped.
    ///
    /// Decades are labelled; ranges covering less than two decades also get
    /// labels on the 2..9 subdivisions.
    pub fn log(min: f64, max: f64) -> Self {
        let (mut min, max) = ordered(min.max(1e-300), max.max(1e-300));
        if max <= min {
            min = max / 10.0;
        }
        let e_lo = min.log10().floor() as i32;
        let e_hi = max.log10().ceil() as i32;
        let plain = e_lo >= -3 && e_hi <= 3;
        let inside = |v: f64| v >= min * (1.0 - 1e-9) && v <= max * (1.0 + 1e-9);

        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let mut minor = Vec::new();
        for exp in e_lo..=e_hi {
            let v = 10f64.powi(exp);
            if inside(v) {
                ticks.push(v);
                labels.push(decade_label(exp, plain));
            }
            for m in 2..=9 {
                let mv = m as f64 * v;
                if inside(mv) {
                    minor.push(mv);
                }
            }
        }
        if ticks.len() < 2 {
            for &mv in &minor {
                ticks.push(mv);
                labels.push(format_tick(mv, 10f64.powf(mv.log10().floor())));
            }
            minor.clear();
            let mut both: Vec<(f64, String)> = ticks.into_iter().zip(labels).collect();
            both.sort_by(|a, b| a.0.total_cmp(&b.0));
            (ticks, labels) = both.into_iter().unzip();
        }

        Self { min, max, log: true, label: String::new(), tick_positions: ticks, tick_labels: labels, minor_ticks: minor }
    }

    /// Axis whose ticks are the given bin labels (alphanumeric axes).
    pub fn labelled(min: f64, max: f64, labels: &[(f64, String)]) -> Self {
        let (min, max) = ordered(min, max);
        Self {
            min,
            max,
            log: false,
            label: String::new(),
            tick_positions: labels.iter().map(|l| l.0).collect(),
            tick_labels: labels.iter().map(|l| l.1.clone()).collect(),
            minor_ticks: Vec::new(),
        }
    }

    /// Fixed axis with explicit limits (no tick auto-generation).
    pub fn fixed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            log: false,
            label: String::new(),
            tick_positions: Vec::new(),
            tick_labels: Vec::new(),
            minor_ticks: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a data value to pixel coordinate.
    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        if self.log {
            let log_val = value.max(1e-300).ln();
            let log_min = self.min.max(1e-300).ln();
            let log_max = self.max.max(1e-300).ln();
            let frac = (log_val - log_min) / (log_max - log_min);
            px_min + frac * (px_max - px_min)
        } else {
            let frac = (value - self.min) / (self.max - self.min);
            px_min + frac * (px_max - px_min)
        }
    }

    /// Map pixel coordinate to data value (inverse).
    pub fn pixel_to_data(&self, px: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (px - px_min) / (px_max - px_min);
        if self.log {
            let log_min = self.min.max(1e-300).ln();
            let log_max = self.max.max(1e-300).ln();
            (log_min + frac * (log_max - log_min)).exp()
        } else {
            self.min + frac * (self.max - self.min)
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if (hi - lo).abs() < 1e-300 { (lo - 0.5, hi + 0.5) } else { (lo, hi) }
}

fn nice_step(rough: f64) -> f64 {
    if !rough.is_finite() || rough <= 0.0 {
        return 1.0;
    }
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    if decimals == 0 {
        // Avoid "-0"
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v.round() as i64)
    } else {
        let v = if value.abs() < step * 1e-6 { 0.0 } else { value };
        format!("{:.prec$}", v, prec = decimals)
    }
}

fn decade_label(exp: i32, plain: bool) -> String {
    match (plain, exp) {
        (true, e) if e >= 0 => format!("{}", 10i64.pow(e as u32)),
        (true, e) => format!("{:.prec$}", 10f64.powi(e), prec = (-e) as usize),
        (false, 0) => "1".to_string(),
        (false, 1) => "10".to_string(),
        (false, e) => format!("10^{{{e}}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_ticks_stay_inside_range() {
        let ax = Axis::linear(0.0, 50.0, 6);
        assert_eq!(ax.min, 0.0);
        assert_eq!(ax.max, 50.0);
        assert_eq!(ax.tick_labels, vec!["0", "10", "20", "30", "40", "50"]);
        let ax = Axis::linear(0.5, 2.0, 6);
        assert_eq!(ax.tick_labels.first().map(String::as_str), Some("0.6"));
        assert_eq!(ax.tick_labels.last().map(String::as_str), Some("2.0"));
        assert!(ax.minor_ticks.iter().all(|&m| (0.5..=2.0).contains(&m)));
    }

    #[test]
    fn negative_zero_is_printed_as_zero() {
        let ax = Axis::linear(-1.0, 1.0, 5);
        assert!(ax.tick_labels.contains(&"0.0".to_string()) || ax.tick_labels.contains(&"0".to_string()));
        assert!(!ax.tick_labels.iter().any(|l| l == "-0.0" || l == "-0"));
    }

    #[test]
    fn data_to_pixel_linear() {
        let ax = Axis::linear(0.0, 100.0, 5);
        let px = ax.data_to_pixel(50.0, 0.0, 500.0);
        assert!((px - 250.0).abs() < 1e-9);
        assert!((ax.pixel_to_data(px, 0.0, 500.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn log_decades() {
        let ax = Axis::log(1e-3, 1.0);
        assert!(ax.log);
        assert_eq!(ax.tick_labels, vec!["0.001", "0.01", "0.1", "1"]);
        assert_eq!(ax.minor_ticks.len(), 24);
        let wide = Axis::log(1e-5, 1e2);
        assert_eq!(wide.tick_labels.first().map(String::as_str), Some("10^{-5}"));
        assert_eq!(wide.tick_labels.last().map(String::as_str), Some("10^{2}"));
        let px = wide.data_to_pixel(1e-1, 0.0, 700.0);
        assert!((px - 400.0).abs() < 1e-6);
    }

    #[test]
    fn narrow_log_range_labels_subdivisions() {
        let ax = Axis::log(2.0, 50.0);
        assert!(ax.tick_labels.contains(&"10".to_string()));
        assert!(ax.tick_labels.contains(&"20".to_string()));
        assert!(ax.tick_positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn nice_step_values() {
        assert!((nice_step(3.2) - 2.0).abs() < 1e-9);
        assert!((nice_step(0.7) - 0.5).abs() < 1e-9);
        assert!((nice_step(15.0) - 10.0).abs() < 1e-9);
        assert!((nice_step(4.5) - 5.0).abs() < 1e-9);
        assert!((nice_step(1.2) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn labelled_axis_uses_bin_centers() {
        let ax = Axis::labelled(0.0, 3.0, &[(0.5, "D^{0}".into()), (1.5, "D^{#plus}".into())]);
        assert_eq!(ax.tick_positions, vec![0.5, 1.5]);
        assert_eq!(ax.tick_labels[1], "D^{#plus}");
        assert!(ax.minor_ticks.is_empty());
    }
}
