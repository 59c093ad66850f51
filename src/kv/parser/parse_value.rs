use super::ParserError;

/// 从字符串解析值
///
/// 基本类型通过 `FromStr` 解析，复杂类型通过 JSON 反序列化，
/// 自定义结构体可以用 [`parse_value_from_json!`](crate::parse_value_from_json) 实现。
pub trait ParseValue: Sized {
    fn parse_value(s: &str) -> Result<Self, ParserError>;
}

impl ParseValue for String {
    fn parse_value(s: &str) -> Result<Self, ParserError> {
        Ok(s.to_string())
    }
}

macro_rules! impl_parse_value_from_str {
    ($($ty:ty),*) => {
        $(
            impl ParseValue for $ty {
                fn parse_value(s: &str) -> Result<Self, ParserError> {
                    s.trim().parse().map_err(|e| ParserError::ParseFailed(
                        format!("failed to parse {} from '{}': {}", stringify!($ty), s, e)
                    ))
                }
            }
        )*
    };
}

impl_parse_value_from_str!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64, bool);

impl ParseValue for serde_json::Value {
    fn parse_value(s: &str) -> Result<Self, ParserError> {
        serde_json::from_str(s)
            .map_err(|e| ParserError::ParseFailed(format!("failed to parse JSON from '{}': {}", s, e)))
    }
}

/// 为实现了 `Deserialize` 的类型生成基于 JSON 的 `ParseValue` 实现
///
/// ```ignore
/// #[derive(serde::Deserialize)]
/// struct User { name: String }
/// kvx::parse_value_from_json!(User);
/// ```
#[macro_export]
macro_rules! parse_value_from_json {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::kv::parser::ParseValue for $ty {
                fn parse_value(s: &str) -> Result<Self, $crate::kv::parser::ParserError> {
                    serde_json::from_str(s).map_err(|e| {
                        $crate::kv::parser::ParserError::ParseFailed(format!(
                            "failed to parse {} from JSON: {}",
                            stringify!($ty),
                            e
                        ))
                    })
                }
            }
        )+
    };
}
