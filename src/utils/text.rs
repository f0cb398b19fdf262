/// 文本工具模块
///
/// 提供中英混排文本的统计与整形辅助函数

/// 判断字符是否为 CJK 字符
///
/// 覆盖基本区、扩展A区和兼容区，标点不计入
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// 统计中英混排文本的词数
///
/// 拉丁文按空白切分计词，CJK 按字符计数，两者相加。
/// 纯空白切分会把整段中文算成一个"词"，所以必须混合计数。
///
/// # 参数
/// - `text`: 待统计文本
///
/// # 返回
/// 返回词数，例如 "hello world 你好世界" 返回 6
pub fn word_count(text: &str) -> usize {
    let mut cjk_chars = 0usize;
    let mut latin_only = String::with_capacity(text.len());
    for c in text.chars() {
        if is_cjk(c) {
            cjk_chars += 1;
            latin_only.push(' ');
        } else {
            latin_only.push(c);
        }
    }
    latin_only.split_whitespace().count() + cjk_chars
}

/// 截断长文本，超长时追加省略号
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 清洗调用方传入的目录名，防止路径穿越
///
/// 只保留 ASCII 字母数字、下划线和连字符，最长 100 个字符。
/// 清洗后为空时由调用方回退到 URL 哈希目录名。
pub fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(100)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_mixed() {
        assert_eq!(word_count("hello world 你好世界"), 6);
    }

    #[test]
    fn test_word_count_latin_only() {
        assert_eq!(word_count("the quick brown fox"), 4);
    }

    #[test]
    fn test_word_count_cjk_only() {
        assert_eq!(word_count("微信公众号文章"), 7);
    }

    #[test]
    fn test_word_count_empty_and_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n\t  "), 0);
    }

    #[test]
    fn test_word_count_cjk_adjacent_to_latin() {
        // CJK 字符紧贴拉丁词，两侧都要计入
        assert_eq!(word_count("Rust语言"), 3);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }

    #[test]
    fn test_sanitize_dir_name() {
        assert_eq!(sanitize_dir_name("my-article_01"), "my-article_01");
        assert_eq!(sanitize_dir_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_dir_name("a/b\\c"), "abc");
        assert_eq!(sanitize_dir_name("技术文章"), "");
    }

    #[test]
    fn test_sanitize_dir_name_truncates() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_dir_name(&long).chars().count(), 100);
    }
}
