// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）、英文、泰文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["zh-CN", "en", "th"];

/// 规范化语言代码，不支持的回退到默认语言
///
/// 接受 "zh"、"zh_CN"、"EN"、"th-TH" 等常见写法
pub fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_ascii_lowercase().replace('_', "-");
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| lower.starts_with(&l[..2].to_ascii_lowercase()))
        .unwrap_or(DEFAULT_LOCALE)
}

/// 按指定语言翻译（不修改全局语言）
///
/// 报表导出使用，避免并发导出互相切换全局 locale
pub fn t_for(locale: &str, key: &str) -> String {
    rust_i18n::t!(key, locale = locale).to_string()
}

/// 按指定语言翻译（带参数）
pub fn t_for_with_args(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    replace_args(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn replace_args(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_for_explicit_locale() {
        assert_eq!(t_for("th", "report.shift"), "กะ");
        assert_eq!(t_for("th", "report.ungrouped"), "อื่นๆ");
        assert_eq!(t_for("en", "flat.result_pass"), "Pass");
        assert_eq!(
            t_for_with_args("th", "report.range", &[("min", "1"), ("max", "2")]),
            "min: 1 | Max: 2"
        );
    }

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("zh_CN"), "zh-CN");
        assert_eq!(normalize_locale("EN"), "en");
        assert_eq!(normalize_locale("th-TH"), "th");
        assert_eq!(normalize_locale("fr"), DEFAULT_LOCALE);
    }
}
