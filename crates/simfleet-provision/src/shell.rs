/// Double-quote `command` for `bash -lc`, escaping `\`, `"`, `$` and
/// backticks so the remote shell sees it verbatim.
pub fn wrap_shell_command(command: &str) -> String {
    let mut wrapped = String::with_capacity(command.len() + 2);
    wrapped.push('"');
    for c in command.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            wrapped.push('\\');
        }
        wrapped.push(c);
    }
    wrapped.push('"');
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command() {
        assert_eq!(wrap_shell_command("systemctl restart sim"), "\"systemctl restart sim\"");
    }

    #[test]
    fn metacharacters_escaped() {
        assert_eq!(
            wrap_shell_command(r#"echo "$HOME" `id` \n"#),
            r#""echo \"\$HOME\" \`id\` \\n""#
        );
    }

    #[test]
    fn single_quotes_untouched() {
        assert_eq!(wrap_shell_command("echo 'a b'"), "\"echo 'a b'\"");
    }
}
