//! Value conversions at generic call boundaries.
//!
//! Generic parameters lower to `any`, and Go has no implicit conversion
//! from `[]int64` to `[]any` or from `func(int64) int64` to
//! `func(any) any`. Compound values are copied or wrapped on the way into a
//! generic function, and generic results are asserted or copied back.

use sprig_core::Type;

use super::emitter::Emitter;

impl Emitter<'_> {
    /// Convert `expr`, a Go value of `from`'s type, to the Go type of `to`.
    pub(super) fn convert(&mut self, expr: String, from: &Type, to: &Type) -> String {
        let from_go = self.go_type(from);
        let to_go = self.go_type(to);
        if from_go == to_go || to_go == "any" {
            return expr;
        }
        if from_go == "any" {
            return format!("{expr}.({to_go})");
        }

        match (from, to) {
            (Type::List { element: from_el }, Type::List { element: to_el }) => {
                let item = self.convert("x".to_string(), from_el, to_el);
                let mut body = vec![
                    format!("out := make({to_go}, len(xs))"),
                    "for i, x := range xs {".to_string(),
                ];
                body.extend(self.indented(&[format!("out[i] = {item}")]));
                body.push("}".to_string());
                body.push("return out".to_string());
                self.applied("xs", &from_go, &to_go, &body, &expr)
            }
            (
                Type::Map {
                    key: from_key,
                    value: from_value,
                },
                Type::Map {
                    key: to_key,
                    value: to_value,
                },
            ) => {
                let key = self.convert("k".to_string(), from_key, to_key);
                let value = self.convert("v".to_string(), from_value, to_value);
                let mut body = vec![
                    format!("out := make({to_go}, len(m))"),
                    "for k, v := range m {".to_string(),
                ];
                body.extend(self.indented(&[format!("out[{key}] = {value}")]));
                body.push("}".to_string());
                body.push("return out".to_string());
                self.applied("m", &from_go, &to_go, &body, &expr)
            }
            (
                Type::Function {
                    params: from_params,
                    ret: from_ret,
                },
                Type::Function {
                    params: to_params,
                    ret: to_ret,
                },
            ) if from_params.len() == to_params.len() => {
                let mut signature = Vec::with_capacity(to_params.len());
                let mut args = Vec::with_capacity(to_params.len());
                for (i, (from_param, to_param)) in from_params.iter().zip(to_params).enumerate() {
                    let name = format!("p{i}");
                    signature.push(format!("{name} {}", self.go_type(to_param)));
                    args.push(self.convert(name, to_param, from_param));
                }
                let result = self.convert(format!("f({})", args.join(", ")), from_ret, to_ret);
                let mut body = vec![format!(
                    "return func({}) {} {{",
                    signature.join(", "),
                    self.go_type(to_ret)
                )];
                body.extend(self.indented(&[format!("return {result}")]));
                body.push("}".to_string());
                self.applied("f", &from_go, &to_go, &body, &expr)
            }
            _ => expr,
        }
    }

    /// `func(param From) To { body }(arg)`
    fn applied(
        &self,
        param: &str,
        from_go: &str,
        to_go: &str,
        body: &[String],
        arg: &str,
    ) -> String {
        format!(
            "func({param} {from_go}) {to_go} {{\n{}\n}}({arg})",
            self.indented(body).join("\n")
        )
    }
}
