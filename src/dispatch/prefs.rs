use super::{HandlerContext, Reply};
use crate::error::Result;
use crate::intent::Command;
use crate::store::PreferenceKey;

fn unsupported_key(raw: &str) -> Reply {
    let supported = PreferenceKey::ALL
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(", ");
    Reply::Final(format!(
        "Sorry, I can't remember '{raw}' yet. I can keep track of your {supported}."
    ))
}

pub(super) fn set_preference(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let raw = cmd.require_str("key")?;
    let Some(key) = PreferenceKey::parse(&raw) else {
        return Ok(unsupported_key(&raw));
    };
    let value = cmd.require_str("value")?;
    ctx.memory.set_pref(key, &value)?;
    Ok(Reply::Confirm(format!(
        "Got it, I'll remember that your {} is {value}.",
        key.label()
    )))
}

pub(super) fn get_preference(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let raw = cmd.require_str("key")?;
    let Some(key) = PreferenceKey::parse(&raw) else {
        return Ok(unsupported_key(&raw));
    };
    Ok(Reply::Final(match ctx.memory.get_pref(key)? {
        Some(value) => format!("You told me your {} is {value}.", key.label()),
        None => format!("I don't have anything saved for {} yet.", key.label()),
    }))
}
