//! Small numeric helpers shared by the physiology and search routines.

use crate::error::{StockError, StockResult};

pub const DAY2RAD: f64 = std::f64::consts::PI * 2.0 / 365.25;
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
pub const VERY_SMALL: f64 = 1.0e-4;

/// Positive difference: `max(x - y, 0)`.
pub fn dim(x: f64, y: f64) -> f64 {
    (x - y).max(0.0)
}

/// Division that yields zero instead of dividing by zero.
pub fn xdiv(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn ramp(x: f64, x0: f64, x1: f64) -> f64 {
    if x0 > x1 {
        1.0 - ramp(x, x1, x0)
    } else if x <= x0 {
        0.0
    } else if x >= x1 {
        1.0
    } else {
        (x - x0) / (x1 - x0)
    }
}

/// Logistic curve parameterised by its 50% point and slope.
pub fn sig(x: f64, params: [f64; 2]) -> f64 {
    let z = params[1] * (x - params[0]);
    if z < -30.0 {
        0.0
    } else if z > 30.0 {
        1.0
    } else {
        1.0 / (1.0 + (-z).exp())
    }
}

/// Gompertz growth constrained so that `f(reference) = 1`.
pub fn gompertz(t: f64, reference: f64, a: f64, b: f64) -> f64 {
    (a * (1.0 - (b * (1.0 - t / reference)).exp())).exp()
}

/// Time derivative of [`gompertz`].
pub fn delta_gompertz(t: f64, reference: f64, a: f64, b: f64) -> f64 {
    let inner = b * (1.0 - t / reference);
    a * b / reference * (inner + a * (1.0 - inner.exp())).exp()
}

/// Day length in hours, including civil twilight when `sun_angle` is -6.
pub fn day_length(day_of_year: u32, latitude: f64, sun_angle: f64) -> f64 {
    let declination = 0.4093 * (DAY2RAD * (day_of_year as f64 - 79.25)).sin();
    let lat = latitude * DEG2RAD;
    let cos_hour = ((sun_angle * DEG2RAD).sin() - lat.sin() * declination.sin())
        / (lat.cos() * declination.cos());
    24.0 / std::f64::consts::PI * cos_hour.clamp(-1.0, 1.0).acos()
}

/// Wood lactation curve normalised to a peak of 1 at `t_max`.
pub fn wood(t: f64, t_max: f64, shape: f64) -> f64 {
    if t <= 0.0 || t_max <= 0.0 {
        return 0.0;
    }
    let r = t / t_max;
    r.powf(shape) * (shape * (1.0 - r)).exp()
}

/// `base^exponent` for a base that must not be negative. A negative base is a data error
/// and is reported rather than clamped.
pub fn checked_pow(base: f64, exponent: f64, context: &'static str) -> StockResult<f64> {
    if base < 0.0 {
        return Err(StockError::NumericDomain { context, base });
    }
    Ok(base.powf(exponent))
}

/// Standard normal cumulative distribution (Abramowitz & Stegun 26.2.17).
pub fn cum_normal(x: f64) -> f64 {
    const P: f64 = 0.231_641_9;
    const B: [f64; 5] = [
        0.319_381_530,
        -0.356_563_782,
        1.781_477_937,
        -1.821_255_978,
        1.330_274_429,
    ];
    let t = 1.0 / (1.0 + P * x.abs());
    let mut poly = 0.0;
    let mut tn = t;
    for b in B {
        poly += b * tn;
        tn *= t;
    }
    let density = (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let upper = density * poly;
    if x >= 0.0 {
        1.0 - upper
    } else {
        upper
    }
}

/// Rounds to the nearest multiple of `step`.
pub fn round_to(x: f64, step: f64) -> f64 {
    step * (x / step).round()
}
