use crate::utils::error::Result;

const SCORED_INSTRUCTIONS: &str = "请对一句商品评论进行情感分类（正面/负面/中性，其中既表现出正面也表现出负面为中性），\
并进行标签提取（如[手机, 屏幕]），并输出评分（1-10分）。\
输出结果必须是一个可直接解析的json字符串，一定不使用markdown，不要参考对话历史记录。";

const SCORED_EXAMPLES: &str = "示例：\n\
输入1：\n这个手机很好用，拍照也很清晰。\n\
输出1：\n{\"sentiment\": \"正面\", \"tags\": [\"手机\", \"拍照\"], \"score\": 9}\n\
输入2：\n这个手机拍照很清晰，但是屏幕太小了。\n\
输出2：\n{\"sentiment\": \"中性\", \"tags\": [\"手机\", \"拍照\", \"屏幕\"], \"score\": 6}\n";

/// 完整模式：情感、標籤與評分
pub fn scored_prompt(text: &str) -> String {
    format!(
        "{}\n{}待处理的句子是：{}",
        SCORED_INSTRUCTIONS, SCORED_EXAMPLES, text
    )
}

/// 只要求情感類別
pub fn label_prompt(text: &str) -> String {
    format!(
        "请对一句商品评论进行情感分类，只输出正面、负面、中性三者之一，\
不要输出任何其他文字。其中既表现出正面也表现出负面为中性。\n待处理的句子是：{}",
        text
    )
}

/// 批次模式：評論以 JSON 陣列送出，要求依序回覆同長度的陣列
pub fn batch_prompt(texts: &[String]) -> Result<String> {
    let encoded = serde_json::to_string(texts)?;
    Ok(format!(
        "下面是一个包含{}条商品评论的json数组。请对每条评论分别进行情感分类（正面/负面/中性，\
其中既表现出正面也表现出负面为中性），并进行标签提取，并输出评分（1-10分）。\
输出结果必须是一个可直接解析的json数组，按输入顺序每条评论对应一个元素，元素个数必须与输入相同，\
每个元素的格式为 {{\"sentiment\": \"正面\", \"tags\": [\"手机\", \"拍照\"], \"score\": 9}}。\
一定不使用markdown，不要参考对话历史记录。\n待处理的评论是：{}",
        texts.len(),
        encoded
    ))
}
