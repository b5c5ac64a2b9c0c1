//! Built-in helper functions and script hooks.
//!
//! Conventions:
//! - Helper names are camelCase, the way calculation authors call them.
//! - Bodies are plain Rhai function bodies registered through the same path
//!   as user functions, so a user function with the same name replaces one.
//! - Optional trailing arguments arrive as `()` and are defaulted in the body.

use crate::engine::{ExecutionLog, FunctionDef};
use rhai::Engine;

pub struct CoreFunction {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub description: &'static str,
    pub code: &'static str,
}

pub const CORE_FUNCTIONS: &[CoreFunction] = &[
    CoreFunction {
        name: "roundToSignificantDigits",
        params: &["value", "sigDigits"],
        description: "Round a number to a number of significant digits",
        code: r#"
            if value == 0 { return value; }
            let v = value * 1.0;
            let order = floor(log(abs(v)));
            let scale = 10.0 ** (sigDigits - 1.0 - order);
            round(v * scale) / scale
        "#,
    },
    CoreFunction {
        name: "percentile",
        params: &["data", "fraction"],
        description: "Interpolated percentile (fraction in 0..1) of an array of numbers",
        code: r#"
            let sorted = data;
            sorted.sort(|a, b| if a < b { -1 } else if a > b { 1 } else { 0 });
            let n = sorted.len();
            if n == 0 { throw "percentile requires at least one value"; }
            let position = fraction * 1.0 * (n - 1);
            let lower = floor(position).to_int();
            let upper = ceiling(position).to_int();
            if lower == upper { return sorted[lower]; }
            let weight = position - lower;
            sorted[lower] + weight * (sorted[upper] - sorted[lower])
        "#,
    },
    CoreFunction {
        name: "normalCDF",
        params: &["x", "mean", "stdDev"],
        description: "Cumulative distribution function of the normal distribution",
        code: r#"
            let m = if type_of(mean) == "()" { 0.0 } else { mean * 1.0 };
            let s = if type_of(stdDev) == "()" { 1.0 } else { stdDev * 1.0 };
            let z = (x - m) / (s * sqrt(2.0));
            let sign = if z >= 0.0 { 1.0 } else { -1.0 };
            let t = abs(z);
            let k = 1.0 / (1.0 + 0.3275911 * t);
            let poly = ((((1.061405429 * k - 1.453152027) * k + 1.421413741) * k - 0.284496736) * k + 0.254829592) * k;
            let erf = 1.0 - poly * exp(-t * t);
            0.5 * (1.0 + sign * erf)
        "#,
    },
    CoreFunction {
        name: "pv",
        params: &["rate", "nper", "payment", "future", "due"],
        description: "Present value of an investment",
        code: r#"
            let f = if type_of(future) == "()" { 0.0 } else { future * 1.0 };
            let d = if type_of(due) == "()" { 0 } else { due };
            if rate == 0 { return -f - payment * nper; }
            let term = (1.0 + rate) ** (nper * 1.0);
            let annuity = payment * (term - 1.0) / (rate * term);
            if d == 1 { -f / term - annuity * (1.0 + rate) } else { -f / term - annuity }
        "#,
    },
    CoreFunction {
        name: "fv",
        params: &["rate", "nper", "payment", "present", "due"],
        description: "Future value of an investment",
        code: r#"
            let p = if type_of(present) == "()" { 0.0 } else { present * 1.0 };
            let d = if type_of(due) == "()" { 0 } else { due };
            if rate == 0 { return -p - payment * nper; }
            let term = (1.0 + rate) ** (nper * 1.0);
            let annuity = payment * (term - 1.0) / rate;
            if d == 1 { -p * term - annuity * (1.0 + rate) } else { -p * term - annuity }
        "#,
    },
    CoreFunction {
        name: "pmt",
        params: &["rate", "nper", "present", "future", "due"],
        description: "Periodic payment for a loan",
        code: r#"
            let f = if type_of(future) == "()" { 0.0 } else { future * 1.0 };
            let d = if type_of(due) == "()" { 0 } else { due };
            if rate == 0 { return -(present + f) / (nper * 1.0); }
            let term = (1.0 + rate) ** (nper * 1.0);
            let numerator = -(present * rate * term + f * rate);
            if d == 1 { numerator / ((1.0 + rate) * (term - 1.0)) } else { numerator / (term - 1.0) }
        "#,
    },
    CoreFunction {
        name: "linearInterpolation",
        params: &["x", "x1", "y1", "x2", "y2"],
        description: "Linear interpolation between two points",
        code: r#"
            if x2 - x1 == 0 { throw "x1 and x2 cannot be equal (division by zero)"; }
            y1 + (x - x1) * 1.0 * (y2 - y1) / (x2 - x1)
        "#,
    },
    CoreFunction {
        name: "interpolateTable",
        params: &["x", "table"],
        description: "Interpolate a value from a table of [x, y] points",
        code: r#"
            if type_of(table) != "array" || table.len() < 2 {
                throw "Table must be an array with at least two points";
            }
            let points = table;
            points.sort(|a, b| if a[0] < b[0] { -1 } else if a[0] > b[0] { 1 } else { 0 });
            let last = points.len() - 1;
            if x < points[0][0] { return points[0][1]; }
            if x > points[last][0] { return points[last][1]; }
            for i in 0..last {
                let x1 = points[i][0];
                let x2 = points[i + 1][0];
                if x >= x1 && x <= x2 {
                    let y1 = points[i][1];
                    let y2 = points[i + 1][1];
                    if x2 == x1 { return y1; }
                    return y1 + (x - x1) * 1.0 * (y2 - y1) / (x2 - x1);
                }
            }
            ()
        "#,
    },
    CoreFunction {
        name: "beamDeflection",
        params: &["load", "length", "elasticModulus", "momentOfInertia"],
        description: "Maximum deflection of a simply supported beam with a central load",
        code: r#"
            (load * length * length * length * 1.0) / (48.0 * elasticModulus * momentOfInertia)
        "#,
    },
    CoreFunction {
        name: "voltageDivider",
        params: &["inputVoltage", "resistor1", "resistor2"],
        description: "Output voltage of a two-resistor divider",
        code: r#"
            inputVoltage * (resistor2 * 1.0 / (resistor1 + resistor2))
        "#,
    },
    CoreFunction {
        name: "reynoldsNumber",
        params: &["density", "velocity", "diameter", "viscosity"],
        description: "Reynolds number of a fluid flow",
        code: r#"
            (density * velocity * diameter * 1.0) / viscosity
        "#,
    },
    CoreFunction {
        name: "factorial",
        params: &["n"],
        description: "Factorial of a non-negative integer",
        code: r#"
            if n < 0 { throw "factorial is undefined for negative numbers"; }
            let result = 1;
            for i in 2..=n { result *= i; }
            result
        "#,
    },
    CoreFunction {
        name: "binomialCoefficient",
        params: &["n", "k"],
        description: "Number of ways to choose k items from n",
        code: r#"
            if k < 0 || k > n { return 0; }
            let r = if k > n - k { n - k } else { k };
            let result = 1;
            for i in 0..r { result = result * (n - i) / (i + 1); }
            result
        "#,
    },
    CoreFunction {
        name: "solveBisection",
        params: &["f", "lower", "upper", "tolerance"],
        description: "Root of f within [lower, upper] by bisection",
        code: r#"
            let a = lower * 1.0;
            let b = upper * 1.0;
            let tol = if type_of(tolerance) == "()" { 0.0000001 } else { tolerance * 1.0 };
            let fa = f.call(a) * 1.0;
            if fa * f.call(b) > 0.0 { throw "root is not bracketed by the interval"; }
            for step in 0..200 {
                let mid = (a + b) / 2.0;
                let fm = f.call(mid) * 1.0;
                if abs(fm) < tol || (b - a) / 2.0 < tol { return mid; }
                if fa * fm < 0.0 { b = mid; } else { a = mid; fa = fm; }
            }
            (a + b) / 2.0
        "#,
    },
];

/// Definitions of every built-in helper, ready for registration.
pub fn core_function_defs() -> Vec<FunctionDef> {
    CORE_FUNCTIONS
        .iter()
        .map(|f| FunctionDef {
            name: f.name.to_string(),
            params: f.params.iter().map(|p| p.to_string()).collect(),
            code: f.code.to_string(),
            description: Some(f.description.to_string()),
            global: true,
        })
        .collect()
}

/// Route script `log("..")` and `print(..)` calls into the execution log.
pub(crate) fn register_log_hook(engine: &mut Engine, log: ExecutionLog) {
    let print_log = log.clone();
    engine.on_print(move |text| print_log.push(format!("Custom code log: {}", text)));
    engine.register_fn("log", move |message: &str| {
        log.push(format!("Custom code log: {}", message));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FunctionLibrary, FunctionRegistry};
    use serde_json::json;

    fn library() -> FunctionLibrary {
        let registry = FunctionRegistry::new();
        for def in core_function_defs() {
            registry.register(&def).unwrap();
        }
        registry.library().unwrap()
    }

    fn call_f64(lib: &FunctionLibrary, name: &str, args: Vec<serde_json::Value>) -> f64 {
        lib.call(name, args).unwrap().as_f64().unwrap()
    }

    #[test]
    fn test_core_functions_compile() {
        let lib = library();
        assert_eq!(lib.functions().len(), CORE_FUNCTIONS.len());
    }

    #[test]
    fn test_interpolation() {
        let lib = library();
        assert_eq!(call_f64(&lib, "linearInterpolation", vec![json!(5), json!(0), json!(0), json!(10), json!(100)]), 50.0);
        let table = json!([[10, 100], [0, 0], [20, 400]]);
        assert_eq!(call_f64(&lib, "interpolateTable", vec![json!(15), table.clone()]), 250.0);
        assert_eq!(call_f64(&lib, "interpolateTable", vec![json!(-5), table]), 0.0);
    }

    #[test]
    fn test_combinatorics() {
        let lib = library();
        assert_eq!(lib.call("factorial", vec![json!(5)]).unwrap(), json!(120));
        assert_eq!(lib.call("binomialCoefficient", vec![json!(5), json!(2)]).unwrap(), json!(10));
        assert!(lib.call("factorial", vec![json!(-1)]).is_err());
    }

    #[test]
    fn test_optional_arguments_default() {
        let lib = library();
        let cdf = call_f64(&lib, "normalCDF", vec![json!(0)]);
        assert!((cdf - 0.5).abs() < 1e-6);
        let payment = call_f64(&lib, "pmt", vec![json!(0), json!(10), json!(1000)]);
        assert!((payment + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_and_rounding() {
        let lib = library();
        assert_eq!(call_f64(&lib, "percentile", vec![json!([4, 1, 3, 2]), json!(0.5)]), 2.5);
        let rounded = call_f64(&lib, "roundToSignificantDigits", vec![json!(123456), json!(2)]);
        assert!((rounded - 120000.0).abs() < 1e-6);
    }
}
