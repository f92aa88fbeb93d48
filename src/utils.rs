// Offset applied when spawning secondary rays, and the minimum accepted
// hit distance during traversal.
pub const RAY_EPSILON: f64 = 1e-4;
// Threshold below which a ray is considered parallel to a surface.
pub const PARALLEL_EPSILON: f64 = 1e-6;

const COEFF_EPSILON: f64 = 1e-12;

pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    if v > max {
        max
    } else if v < min {
        min
    } else {
        v
    }
}

// Real roots of a*x^2 + b*x + c = 0, unordered. Returns the root buffer
// and how many entries are valid.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> ([f64; 2], usize) {
    if a.abs() < COEFF_EPSILON {
        if b.abs() < COEFF_EPSILON {
            return ([0.0; 2], 0);
        }
        return ([-c / b, 0.0], 1);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return ([0.0; 2], 0);
    }
    let sqrt_disc = discriminant.sqrt();
    (
        [
            (-b - sqrt_disc) / (2.0 * a),
            (-b + sqrt_disc) / (2.0 * a),
        ],
        2,
    )
}

// Real roots of a*x^3 + b*x^2 + c*x + d = 0 via Cardano, with the
// trigonometric form for the three-real-root case.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> ([f64; 3], usize) {
    if a.abs() < COEFF_EPSILON {
        let (q_roots, n) = solve_quadratic(b, c, d);
        return ([q_roots[0], q_roots[1], 0.0], n);
    }
    let b = b / a;
    let c = c / a;
    let d = d / a;

    // Depressed form t^3 + p*t + q with x = t - b/3.
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = b / 3.0;

    let half_q = q / 2.0;
    let third_p = p / 3.0;
    let discriminant = half_q * half_q + third_p * third_p * third_p;

    if discriminant > 0.0 {
        let sqrt_disc = discriminant.sqrt();
        let t = (-half_q + sqrt_disc).cbrt() + (-half_q - sqrt_disc).cbrt();
        return ([t - shift, 0.0, 0.0], 1);
    }
    if p.abs() < COEFF_EPSILON {
        // p and q both vanish: triple root.
        return ([-shift, 0.0, 0.0], 1);
    }

    let m = 2.0 * (-third_p).sqrt();
    let theta = clamp(3.0 * q / (p * m), -1.0, 1.0).acos() / 3.0;
    let mut roots = [0.0; 3];
    for (k, root) in roots.iter_mut().enumerate() {
        let angle = theta - 2.0 * std::f64::consts::PI * k as f64 / 3.0;
        *root = m * angle.cos() - shift;
    }
    (roots, 3)
}

// Real roots of a*x^4 + b*x^3 + c*x^2 + d*x + e = 0 using Ferrari's
// method: depress the quartic, solve the resolvent cubic, then factor
// into two quadratics.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> ([f64; 4], usize) {
    if a.abs() < COEFF_EPSILON {
        let (c_roots, n) = solve_cubic(b, c, d, e);
        return ([c_roots[0], c_roots[1], c_roots[2], 0.0], n);
    }
    let b = b / a;
    let c = c / a;
    let d = d / a;
    let e = e / a;

    // Depressed form y^4 + p*y^2 + q*y + r with x = y - b/4.
    let p = c - 3.0 * b * b / 8.0;
    let q = b * b * b / 8.0 - b * c / 2.0 + d;
    let r = -3.0 * b * b * b * b / 256.0 + b * b * c / 16.0 - b * d / 4.0 + e;
    let shift = b / 4.0;

    let mut roots = [0.0; 4];
    let mut count = 0;

    if q.abs() < COEFF_EPSILON {
        // Biquadratic: substitute z = y^2.
        let (z_roots, z_count) = solve_quadratic(1.0, p, r);
        for &z in z_roots.iter().take(z_count) {
            if z > COEFF_EPSILON {
                let y = z.sqrt();
                roots[count] = y - shift;
                roots[count + 1] = -y - shift;
                count += 2;
            } else if z >= -COEFF_EPSILON {
                roots[count] = -shift;
                count += 1;
            }
        }
        return (roots, count);
    }

    // Resolvent cubic 8m^3 + 8p*m^2 + (2p^2 - 8r)*m - q^2 = 0. Its largest
    // real root is positive whenever q is nonzero.
    let (m_roots, m_count) = solve_cubic(8.0, 8.0 * p, 2.0 * p * p - 8.0 * r, -q * q);
    let mut m = std::f64::MIN;
    for &candidate in m_roots.iter().take(m_count) {
        if candidate > m {
            m = candidate;
        }
    }
    if m_count == 0 || m <= 0.0 {
        return (roots, 0);
    }

    let s = (2.0 * m).sqrt();
    let base = p / 2.0 + m;
    let offset = q / (2.0 * s);
    for &(lin, constant) in [(-s, base + offset), (s, base - offset)].iter() {
        let (y_roots, y_count) = solve_quadratic(1.0, lin, constant);
        for &y in y_roots.iter().take(y_count) {
            roots[count] = y - shift;
            count += 1;
        }
    }
    (roots, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contains(roots: &[f64], count: usize, expected: f64) {
        assert!(
            roots
                .iter()
                .take(count)
                .any(|r| (r - expected).abs() < 1e-7),
            "expected root {} in {:?}",
            expected,
            &roots[..count]
        );
    }

    #[test]
    fn quadratic_roots() {
        let (roots, count) = solve_quadratic(1.0, -5.0, 6.0);
        assert_eq!(count, 2);
        assert_contains(&roots, count, 2.0);
        assert_contains(&roots, count, 3.0);

        let (_, count) = solve_quadratic(1.0, 0.0, 1.0);
        assert_eq!(count, 0);
    }

    #[test]
    fn cubic_three_real_roots() {
        // (x - 1)(x + 2)(x - 4) = x^3 - 3x^2 - 6x + 8
        let (roots, count) = solve_cubic(1.0, -3.0, -6.0, 8.0);
        assert_eq!(count, 3);
        assert_contains(&roots, count, 1.0);
        assert_contains(&roots, count, -2.0);
        assert_contains(&roots, count, 4.0);
    }

    #[test]
    fn cubic_single_real_root() {
        // x^3 - 1 has one real root.
        let (roots, count) = solve_cubic(1.0, 0.0, 0.0, -1.0);
        assert_eq!(count, 1);
        assert_contains(&roots, count, 1.0);
    }

    #[test]
    fn quartic_four_real_roots() {
        // (x - 1)(x - 2)(x - 3)(x - 5) = x^4 - 11x^3 + 41x^2 - 61x + 30
        let (roots, count) = solve_quartic(1.0, -11.0, 41.0, -61.0, 30.0);
        assert_eq!(count, 4);
        assert_contains(&roots, count, 1.0);
        assert_contains(&roots, count, 2.0);
        assert_contains(&roots, count, 3.0);
        assert_contains(&roots, count, 5.0);
    }

    #[test]
    fn quartic_biquadratic_roots() {
        // (x^2 - 1)(x^2 - 4) = x^4 - 5x^2 + 4
        let (roots, count) = solve_quartic(1.0, 0.0, -5.0, 0.0, 4.0);
        assert_eq!(count, 4);
        assert_contains(&roots, count, 1.0);
        assert_contains(&roots, count, -1.0);
        assert_contains(&roots, count, 2.0);
        assert_contains(&roots, count, -2.0);
    }

    #[test]
    fn quartic_no_real_roots() {
        // x^4 + 1 has no real roots.
        let (_, count) = solve_quartic(1.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(count, 0);
    }
}
