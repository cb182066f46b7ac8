use crate::launch::{launch, Launch};
use crate::parse::parse_line;
use crate::{Flow, ShellConfig};

/// Evaluate one command line typed at the prompt.
///
/// Errors are printed on their own line and never end the shell; only `quit`
/// returns [`Flow::Quit`].
pub fn eval(line: &str, config: &ShellConfig) -> Flow {
    let parsed = parse_line(line);
    if parsed.is_empty() {
        return Flow::Continue;
    }

    match launch(line, &parsed.argv, parsed.background, config) {
        Ok(Launch::Builtin(flow)) => flow,
        Ok(launched) => {
            log::trace!("{:?}", launched);
            Flow::Continue
        }
        Err(err) => {
            if !err.is_user_error() {
                log::debug!("{:?}", err);
            }
            println!("{}", err);
            Flow::Continue
        }
    }
}
