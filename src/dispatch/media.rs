use super::{HandlerContext, Reply};
use crate::actions::Player;
use crate::error::Result;
use crate::intent::Command;

fn player(cmd: &Command) -> Player {
    Player::from_app(cmd.str_arg("app").as_deref())
}

pub(super) fn music_play(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let playlist = cmd.str_arg("playlist");
    let reply = match (player(cmd), playlist) {
        (Player::Spotify, Some(playlist)) => ctx.music.play_playlist(&playlist)?,
        (Player::Spotify, None) => ctx.music.resume()?,
        (local, playlist) => ctx.actions.music_play(local, playlist.as_deref())?,
    };
    Ok(Reply::Final(reply))
}

pub(super) fn music_pause(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let reply = match player(cmd) {
        Player::Spotify => ctx.music.pause()?,
        local => ctx.actions.music_pause(local)?,
    };
    Ok(Reply::Final(reply))
}

pub(super) fn music_next(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let reply = match player(cmd) {
        Player::Spotify => ctx.music.next_track()?,
        local => ctx.actions.music_next(local)?,
    };
    Ok(Reply::Final(reply))
}

pub(super) fn music_previous(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let reply = match player(cmd) {
        Player::Spotify => ctx.music.previous_track()?,
        local => ctx.actions.music_previous(local)?,
    };
    Ok(Reply::Final(reply))
}

pub(super) fn music_current(ctx: &HandlerContext, _cmd: &Command) -> Result<Reply> {
    ctx.music.current_track().map(Reply::Final)
}
