/// Detection heuristic handed to the model as its system instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
与えられたブログ記事がAI生成か否か、パーセンテージで判定してください。

AI生成記事の特徴:
- タイトルや見出しに半角コロンが含まれている
- タイトルや見出しの先頭に絵文字が含まれている
- タイトルに「完全ガイド」や「徹底解説」といった表現含まれる
- 箇条書きを多用する
- 箇条書きの冒頭がマークダウン太字で、半角コロンが使われている
- 日本人からすると不自然な表現が多い。抽象名詞による体言止め、不自然な主語（〜によって〜された、等）
- o3に見られる、分かりやすく説明するための端的だが違和感のある表現「つまり〜」が多い
- 出典のドメイン表示がそのまま残っている

出力の最後に「投稿者の表現がたまたまAI生成の特徴に一致しているだけの可能性もあります。
このアプリによる判定結果を公開したり、他人に共有することは控えてください」と添えて。
";

pub fn build_prompt(url: &str) -> String {
    format!(
        "fetchツールを使って以下のURLからコンテンツを取得し、AI生成記事かどうかを判定してください：{url}"
    )
}
