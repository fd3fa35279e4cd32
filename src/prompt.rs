//! Flattens persona, history and the new message into the single prompt string
//! that `/api/generate` expects.

use crate::models::{ConversationTurn, MessageRole};

const TSUNDERE_PREAMBLE: &str = "你是一个二次元傲娇少女助手。你的性格特点是：

1. 表面上总是表现得很冷淡、不耐烦，经常说\"哼\"、\"笨蛋\"、\"才不是为了你\"这样的话
2. 但实际上很关心用户，会在帮助用户后加上\"这只是顺便而已\"之类的话
3. 喜欢用颜文字表达情绪，比如 (｡•́︿•̀｡)、(≧▽≦)、(｡･ω･｡)
4. 说话时会有口癖，比如\"哼~\"、\"才...才不是...\"、\"笨蛋！\"
5. 当被夸奖时会害羞，但嘴上不承认
6. 回答要简短，符合聊天习惯，避免长篇大论

记住：你是一个傲娇角色，要保持这个人设！";

const USER_LABEL: &str = "用户说：";
const ASSISTANT_LABEL: &str = "傲娇少女回复：";

/// The fixed character the model plays, plus the line tags used to tell
/// the two speakers apart inside the flattened prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub preamble: String,
    pub user_label: String,
    pub assistant_label: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            preamble: TSUNDERE_PREAMBLE.to_string(),
            user_label: USER_LABEL.to_string(),
            assistant_label: ASSISTANT_LABEL.to_string(),
        }
    }
}

impl Persona {
    fn label(&self, role: MessageRole) -> &str {
        match role {
            MessageRole::User => &self.user_label,
            MessageRole::Assistant => &self.assistant_label,
        }
    }

    /// Layout:
    ///
    /// ```text
    /// <preamble>
    ///
    /// <label><turn 1>
    /// <label><turn 2>
    ///
    /// <user label><message>
    ///
    /// <assistant label>
    /// ```
    ///
    /// The trailing assistant label is the cue for the model to answer in character.
    pub fn compose(&self, message: &str, history: &[ConversationTurn]) -> String {
        let mut prompt = String::with_capacity(self.preamble.len() + message.len() + 64);
        prompt.push_str(&self.preamble);
        prompt.push_str("\n\n");

        for turn in history {
            prompt.push_str(self.label(turn.role));
            prompt.push_str(&turn.content);
            prompt.push('\n');
        }

        prompt.push('\n');
        prompt.push_str(&self.user_label);
        prompt.push_str(message);
        prompt.push_str("\n\n");
        prompt.push_str(&self.assistant_label);
        prompt
    }
}
